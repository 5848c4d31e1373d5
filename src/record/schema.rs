// Field layout of an Indonesian Supreme Court decision record. Doc comments
// become schema descriptions and are read by the model.

use super::{Integer, Number};
use crate::field::Field;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

record_types! {
    /// Structured address, split into Indonesian administrative levels.
    pub struct StructuredAddress {
        /// Street name and house number
        pub street: String,
        /// RT/RW neighbourhood unit, e.g. "003/005"
        pub rt_rw: String,
        /// Kelurahan or desa
        pub kelurahan: String,
        pub kecamatan: String,
        /// City or regency (kota / kabupaten)
        pub city: String,
        pub province: String,
        /// Complete address as written in the decision
        pub full_address: String,
    }

    /// Identity of the defendant (terdakwa).
    pub struct Defendant {
        /// Full name of the defendant
        pub name: String,
        /// Alias, if any
        pub alias: String,
        /// Patronymic, e.g. "bin Ahmad"
        pub patronymic: String,
        pub place_of_birth: String,
        /// Date of birth, YYYY-MM-DD
        pub date_of_birth: String,
        /// Age at the time of the verdict
        pub age: Integer,
        /// "Laki-laki" or "Perempuan"
        pub gender: String,
        pub citizenship: String,
        pub address: StructuredAddress,
        pub religion: String,
        pub occupation: String,
        /// Highest education level
        pub education: String,
    }

    /// Defence counsel (penasihat hukum).
    pub struct LegalCounsel {
        pub name: String,
        /// Law office name
        pub office_name: String,
        pub office_address: String,
    }

    /// The court that issued the decision.
    pub struct Court {
        /// Case register number
        pub case_register_number: String,
        /// Decision number, e.g. "123 K/Pid.Sus/2024"
        pub verdict_number: String,
        pub court_name: String,
        /// "Pengadilan Negeri", "Pengadilan Tinggi" or "Mahkamah Agung"
        pub court_level: String,
        pub province: String,
        pub city: String,
    }

    pub struct Person {
        pub name: String,
        /// Role, e.g. "Hakim Ketua", "Hakim Anggota", "Panitera Pengganti"
        pub role: String,
    }

    /// Judges, prosecutors and clerks named in the decision.
    pub struct CourtPersonnel {
        pub judges: Vec<Person>,
        pub prosecutors: Vec<Person>,
        pub court_clerks: Vec<Person>,
    }

    pub struct CrimePeriod {
        /// YYYY-MM-DD
        pub start_date: String,
        /// YYYY-MM-DD
        pub end_date: String,
        /// Period as written, e.g. "sekitar bulan Januari 2019"
        pub description: String,
    }

    /// A statutory article cited in the indictment, demand or verdict.
    pub struct CitedArticle {
        /// Article, e.g. "Pasal 2 ayat (1)"
        pub article: String,
        pub law_name: String,
        pub law_number: String,
        pub law_year: Integer,
        /// Full citation as written
        pub full_citation: String,
    }

    /// The prosecution's indictment (dakwaan).
    pub struct Indictment {
        /// "tunggal", "alternatif", "subsidiair", "kumulatif" or "kombinasi"
        pub r#type: String,
        /// Chronology of the alleged acts
        pub chronology: String,
        pub crime_location: String,
        pub crime_period: CrimePeriod,
        pub cited_articles: Vec<CitedArticle>,
        /// Whether a defence exception (eksepsi) was filed and its outcome
        pub defense_exception_status: String,
    }

    /// The prosecution's sentencing demand (tuntutan).
    pub struct ProsecutionDemand {
        /// YYYY-MM-DD
        pub date: String,
        pub articles: Vec<CitedArticle>,
        pub content: String,
        pub prison_sentence_months: Number,
        pub prison_sentence_description: String,
        /// Rupiah, number only
        pub fine_amount: Number,
        pub fine_subsidiary_confinement_months: Integer,
        /// Rupiah, number only
        pub restitution_amount: Number,
        pub restitution_subsidiary_type: String,
        pub restitution_subsidiary_duration_months: Integer,
    }

    /// Legal facts grouped by category.
    pub struct LegalFacts {
        pub organizational_structure: Vec<String>,
        pub standard_procedures: Vec<String>,
        pub violations: Vec<String>,
        pub financial_irregularities: Vec<String>,
        pub witness_testimonies: Vec<String>,
        pub documentary_evidence: Vec<String>,
        pub other_facts: Vec<String>,
    }

    pub struct JudicialConsiderations {
        /// The judges' consideration of each element of the offence
        pub legal_element_considerations: Vec<String>,
        pub aggravating_factors: Vec<String>,
        pub mitigating_factors: Vec<String>,
    }

    pub struct Imprisonment {
        pub duration_months: Integer,
        /// As written, e.g. "1 (satu) tahun 6 (enam) bulan"
        pub description: String,
    }

    pub struct Fine {
        /// Rupiah, number only
        pub amount: Number,
        pub subsidiary_confinement_months: Integer,
    }

    pub struct Restitution {
        /// Rupiah, number only
        pub amount: Number,
        pub already_paid: Number,
        pub remaining: Number,
        pub subsidiary_type: String,
        pub subsidiary_duration_months: Integer,
    }

    pub struct Sentences {
        pub imprisonment: Imprisonment,
        pub fine: Fine,
        pub restitution: Restitution,
    }

    /// The final verdict (putusan).
    pub struct Verdict {
        pub number: String,
        /// YYYY-MM-DD
        pub date: String,
        /// Weekday the verdict was read
        pub day: String,
        pub year: Integer,
        /// "guilty", "acquitted", "released" or the ruling as written
        pub result: String,
        pub primary_charge_proven: bool,
        pub subsidiary_charge_proven: bool,
        pub proven_articles: Vec<CitedArticle>,
        /// Each numbered item of the ruling (amar putusan)
        pub ruling_contents: Vec<String>,
        pub sentences: Sentences,
    }

    pub struct PerpetratorProceeds {
        pub name: String,
        /// Rupiah, number only
        pub amount: Number,
        pub role: String,
    }

    /// State financial loss (kerugian keuangan negara).
    pub struct StateLoss {
        /// Auditing body, e.g. "BPK" or "BPKP"
        pub auditor: String,
        pub audit_report_number: String,
        /// YYYY-MM-DD
        pub audit_report_date: String,
        pub indicted_amount: Number,
        pub proven_amount: Number,
        pub returned_amount: Number,
        pub remaining_due: Number,
        /// Defaults to "IDR"
        pub currency: String,
        pub perpetrators_proceeds: Vec<PerpetratorProceeds>,
    }

    pub struct RelatedCase {
        pub defendant_name: String,
        pub case_number: String,
        pub status: String,
        /// How the case relates, e.g. "berkas terpisah (splitsing)"
        pub relationship: String,
    }

    pub struct CaseMetadata {
        /// e.g. "Korupsi", "Narkotika"
        pub crime_category: String,
        pub crime_subcategory: String,
        /// Government institution involved, if any
        pub institution_involved: String,
        pub related_cases: Vec<RelatedCase>,
    }

    pub struct DetentionPeriod {
        /// Detaining authority, e.g. "Penyidik", "Penuntut Umum"
        pub stage: String,
        pub start_date: String,
        pub end_date: String,
        pub duration_days: Integer,
        pub location: String,
    }

    pub struct LowerCourtSentence {
        pub imprisonment: String,
        pub fine: String,
        pub restitution: String,
    }

    pub struct LowerCourtDecision {
        pub court_name: String,
        pub verdict_number: String,
        pub verdict_date: String,
        pub primary_charge_ruling: String,
        pub subsidiary_charge_ruling: String,
        pub sentence: LowerCourtSentence,
    }

    pub struct AppealProcess {
        /// Who filed the appeal (kasasi)
        pub applicant: String,
        pub request_date: String,
        pub registration_date: String,
        pub notification_to_defendant: String,
        pub notification_to_prosecutor: String,
        pub memorandum_filed: bool,
        pub memorandum_date: String,
        pub contra_memorandum_filed: bool,
        pub contra_memorandum_date: String,
        pub judge_notes: String,
    }

    pub struct EvidenceItem {
        pub item: String,
        pub recipient: String,
        pub condition: String,
        pub status: String,
    }

    /// What the ruling ordered for each piece of evidence (barang bukti).
    pub struct EvidenceInventory {
        pub returned_to_defendant: Vec<EvidenceItem>,
        pub returned_to_third_party: Vec<EvidenceItem>,
        pub confiscated_for_state: Vec<EvidenceItem>,
        pub destroyed: Vec<EvidenceItem>,
        pub attached_to_case_file: Vec<EvidenceItem>,
        pub used_in_other_case: Vec<EvidenceItem>,
    }

    pub struct AdditionalCaseData {
        pub detention_history: Vec<DetentionPeriod>,
        pub lower_court_decision: LowerCourtDecision,
        pub appeal_process: AppealProcess,
        pub evidence_inventory: EvidenceInventory,
    }

    /// Everything extracted from one court decision.
    pub struct ExtractionRecord {
        pub defendant: Defendant,
        pub legal_counsels: Vec<LegalCounsel>,
        pub court: Court,
        pub court_personnel: CourtPersonnel,
        pub indictment: Indictment,
        pub prosecution_demand: ProsecutionDemand,
        pub legal_facts: LegalFacts,
        pub judicial_considerations: JudicialConsiderations,
        pub verdict: Verdict,
        pub state_loss: StateLoss,
        pub case_metadata: CaseMetadata,
        pub additional_case_data: AdditionalCaseData,
        /// Overall extraction confidence between 0.0 and 1.0
        pub extraction_confidence: Number,
    }
}
