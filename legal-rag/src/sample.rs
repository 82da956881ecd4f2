//! Built-in sample corpus so the pipeline runs without any legal-data API.

use crate::document::{DocumentType, Jurisdiction, LegalDocument};

#[allow(clippy::too_many_arguments)]
fn doc(
    id: &str,
    case_name: &str,
    citation: &str,
    court: &str,
    jurisdiction: Jurisdiction,
    date_filed: &str,
    text: &str,
    snippet: &str,
    url: &str,
    document_type: DocumentType,
) -> LegalDocument {
    LegalDocument {
        id: id.into(),
        case_name: case_name.into(),
        citation: citation.into(),
        court: court.into(),
        jurisdiction,
        date_filed: date_filed.into(),
        text: text.into(),
        snippet: snippet.into(),
        url: url.into(),
        document_type,
    }
}

/// Eight sample court opinions across federal and state courts.
pub fn sample_case_law() -> Vec<LegalDocument> {
    use DocumentType::CaseLaw;
    use Jurisdiction::{Federal, State};

    vec![
        doc(
            "sample_1",
            "Smith v. Jones",
            "123 F.3d 456 (9th Cir. 2020)",
            "ca9",
            Federal,
            "2020-03-15",
            "The Ninth Circuit held that employment contracts must be interpreted according to \
             their plain meaning. When an employee handbook explicitly states that employment is \
             at-will, courts should not infer additional job security protections absent clear \
             and unambiguous language to the contrary. The court emphasized that employers have \
             the right to modify policies, but must provide adequate notice to employees.",
            "Employment contracts interpreted by plain meaning...",
            "https://example.com/sample1",
            CaseLaw,
        ),
        doc(
            "sample_2",
            "TechCorp v. Innovation Labs",
            "567 F. Supp. 3d 890 (N.D. Cal. 2021)",
            "cand",
            Federal,
            "2021-06-22",
            "The district court ruled that trade secret misappropriation requires proof that the \
             defendant acquired information through improper means. Mere similarity between \
             products is insufficient. The plaintiff must demonstrate that the defendant knew or \
             should have known the information was obtained through breach of confidentiality. \
             The court applied the Defend Trade Secrets Act and found that independent \
             development is a complete defense.",
            "Trade secret misappropriation requires improper acquisition...",
            "https://example.com/sample2",
            CaseLaw,
        ),
        doc(
            "sample_3",
            "Miranda v. Arizona",
            "384 U.S. 436 (1966)",
            "scotus",
            Federal,
            "1966-06-13",
            "The Supreme Court established that criminal suspects must be informed of their \
             constitutional rights before custodial interrogation. The Fifth Amendment privilege \
             against self-incrimination requires law enforcement to advise individuals of their \
             right to remain silent and right to counsel. Any statements obtained without proper \
             Miranda warnings are inadmissible in court. This landmark decision fundamentally \
             changed criminal procedure across the United States.",
            "Constitutional rights during custodial interrogation...",
            "https://example.com/sample3",
            CaseLaw,
        ),
        doc(
            "sample_4",
            "Johnson v. State Board of Education",
            "234 P.3d 567 (Cal. 2019)",
            "cal",
            State,
            "2019-09-10",
            "The California Supreme Court held that state education regulations must comply with \
             equal protection guarantees. School districts cannot implement policies that \
             disproportionately burden students based on protected characteristics without \
             demonstrating a compelling state interest. The court applied strict scrutiny review \
             and found that less restrictive alternatives existed. This decision reinforced \
             California's commitment to educational equity and non-discrimination.",
            "Equal protection in education policy...",
            "https://example.com/sample4",
            CaseLaw,
        ),
        doc(
            "sample_5",
            "United States v. Digital Privacy Foundation",
            "789 F.3d 123 (2nd Cir. 2022)",
            "ca2",
            Federal,
            "2022-11-08",
            "The Second Circuit addressed Fourth Amendment protections for digital \
             communications. The court held that warrantless searches of electronic devices \
             violate the Fourth Amendment absent exigent circumstances. Cloud-stored data \
             receives the same constitutional protection as physical documents. Law enforcement \
             must obtain a warrant supported by probable cause before accessing personal digital \
             information. The decision balanced privacy rights with law enforcement needs in the \
             digital age.",
            "Fourth Amendment protections for digital data...",
            "https://example.com/sample5",
            CaseLaw,
        ),
        doc(
            "sample_6",
            "Green Construction v. Workers Union Local 45",
            "456 N.Y.S.2d 789 (N.Y. App. Div. 2020)",
            "nyappdiv",
            State,
            "2020-04-17",
            "The New York Appellate Division ruled on collective bargaining disputes in the \
             construction industry. The court held that employers must bargain in good faith \
             with certified union representatives. Unilateral changes to working conditions \
             during active negotiations constitute unfair labor practices. The decision \
             emphasized that labor law seeks to balance employer interests with worker \
             protections and promote industrial peace through structured negotiations.",
            "Collective bargaining and good faith negotiations...",
            "https://example.com/sample6",
            CaseLaw,
        ),
        doc(
            "sample_7",
            "Environmental Defense Fund v. State EPA",
            "890 F.3d 234 (D.C. Cir. 2023)",
            "cadc",
            Federal,
            "2023-02-28",
            "The D.C. Circuit reviewed environmental regulations under the Clean Air Act. The \
             court held that federal agencies must base regulations on scientific evidence and \
             cannot ignore significant environmental harms. When data demonstrates public health \
             risks, the EPA has a statutory duty to act. The decision reinforced the importance \
             of evidence-based policymaking and judicial deference to agency expertise within \
             statutory boundaries.",
            "Environmental regulation and scientific evidence...",
            "https://example.com/sample7",
            CaseLaw,
        ),
        doc(
            "sample_8",
            "Martinez v. Landlord Property Management",
            "345 Cal. Rptr. 3d 678 (Cal. Ct. App. 2021)",
            "calctapp",
            State,
            "2021-07-14",
            "The California Court of Appeal addressed tenant rights under state housing law. The \
             court held that landlords must maintain habitable premises and cannot retaliate \
             against tenants who report code violations. Constructive eviction occurs when \
             conditions become so poor that reasonable tenants are forced to leave. The decision \
             protected vulnerable renters and clarified remedies available under California's \
             tenant protection statutes.",
            "Tenant rights and habitability requirements...",
            "https://example.com/sample8",
            CaseLaw,
        ),
    ]
}

/// Four sample CFR sections.
pub fn sample_regulations() -> Vec<LegalDocument> {
    use DocumentType::Regulation;
    use Jurisdiction::Federal;

    vec![
        doc(
            "reg_sample_1",
            "29 CFR § 1630.2 - Definitions (ADA Employment Regulations)",
            "29 CFR § 1630.2",
            "ecfr",
            Federal,
            "2023-01-01",
            "The Americans with Disabilities Act defines disability as a physical or mental \
             impairment that substantially limits one or more major life activities. Employers \
             must provide reasonable accommodations unless doing so would impose undue hardship \
             on business operations. Major life activities include caring for oneself, \
             performing manual tasks, seeing, hearing, eating, sleeping, walking, standing, \
             lifting, bending, speaking, breathing, learning, reading, concentrating, thinking, \
             communicating, and working.",
            "ADA employment regulations defining disability and accommodation requirements...",
            "https://www.ecfr.gov/current/title-29/subtitle-B/chapter-XIV/part-1630",
            Regulation,
        ),
        doc(
            "reg_sample_2",
            "17 CFR § 240.10b-5 - Employment of manipulative and deceptive devices",
            "17 CFR § 240.10b-5",
            "ecfr",
            Federal,
            "2022-06-15",
            "It is unlawful for any person to employ any device, scheme, or artifice to defraud \
             in connection with the purchase or sale of any security. This includes making \
             untrue statements of material fact or omitting material facts necessary to make \
             statements not misleading. The rule also prohibits engaging in any act, practice, \
             or course of business which operates as fraud or deceit upon any person. This is \
             the primary antifraud provision under federal securities law.",
            "Securities fraud prohibition under SEC Rule 10b-5...",
            "https://www.ecfr.gov/current/title-17/chapter-II/part-240/section-240.10b-5",
            Regulation,
        ),
        doc(
            "reg_sample_3",
            "16 CFR Part 312 - Children's Online Privacy Protection Rule (COPPA)",
            "16 CFR Part 312",
            "ecfr",
            Federal,
            "2023-03-20",
            "Operators of websites or online services directed to children under 13 must obtain \
             verifiable parental consent before collecting personal information. The rule \
             requires clear privacy policies, reasonable security measures, and limits on data \
             collection to what is necessary. Parents have the right to review and delete their \
             child's information. Violations can result in civil penalties. This rule implements \
             the Children's Online Privacy Protection Act.",
            "COPPA requirements for protecting children's online privacy...",
            "https://www.ecfr.gov/current/title-16/chapter-I/subchapter-C/part-312",
            Regulation,
        ),
        doc(
            "reg_sample_4",
            "40 CFR § 52.21 - Prevention of significant deterioration of air quality",
            "40 CFR § 52.21",
            "ecfr",
            Federal,
            "2022-11-08",
            "New major sources and major modifications at existing sources must obtain permits \
             demonstrating use of best available control technology (BACT). The rule protects \
             air quality in areas meeting National Ambient Air Quality Standards. Applicants \
             must conduct air quality analyses and demonstrate that emissions will not cause or \
             contribute to violations. Public notice and comment periods are required. This \
             implements the Clean Air Act's PSD program.",
            "EPA air quality prevention of significant deterioration rules...",
            "https://www.ecfr.gov/current/title-40/chapter-I/subchapter-C/part-52/subpart-A/section-52.21",
            Regulation,
        ),
    ]
}

/// Case law followed by regulations.
pub fn sample_corpus() -> Vec<LegalDocument> {
    let mut corpus = sample_case_law();
    corpus.extend(sample_regulations());
    corpus
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sample_ids_are_unique() {
        let corpus = sample_corpus();
        let ids: HashSet<_> = corpus.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), corpus.len());
        assert_eq!(corpus.len(), 12);
    }

    #[test]
    fn sample_covers_both_jurisdictions() {
        let corpus = sample_case_law();
        assert!(corpus.iter().any(|d| d.jurisdiction == Jurisdiction::State));
        assert!(corpus.iter().any(|d| d.jurisdiction == Jurisdiction::Federal));
    }
}
