use std::collections::HashMap;
use std::sync::LazyLock;

/// One row of the VA diagnostic-code table: a short numeric code mapped to
/// the condition it names, its regulation citation, and its rating schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticCode {
    pub code: &'static str,
    pub condition: &'static str,
    pub part: &'static str,
    pub section: &'static str,
    pub schedule: &'static str,
}

const fn dc(
    code: &'static str,
    condition: &'static str,
    part: &'static str,
    section: &'static str,
    schedule: &'static str,
) -> DiagnosticCode {
    DiagnosticCode {
        code,
        condition,
        part,
        section,
        schedule,
    }
}

pub const DIAGNOSTIC_CODES: &[DiagnosticCode] = &[
    dc("9411", "PTSD", "4", "130", "Mental Disorders"),
    dc("9434", "Major Depressive Disorder", "4", "130", "Mental Disorders"),
    dc("9400", "Generalized Anxiety Disorder", "4", "130", "Mental Disorders"),
    dc("9201", "Schizophrenia", "4", "130", "Mental Disorders"),
    dc("9432", "Bipolar Disorder", "4", "130", "Mental Disorders"),
    dc("9413", "Unspecified Anxiety Disorder", "4", "130", "Mental Disorders"),
    dc("9440", "Chronic Adjustment Disorder", "4", "130", "Mental Disorders"),
    dc("6602", "Asthma (Bronchial)", "4", "97", "Respiratory System"),
    dc("6604", "COPD", "4", "97", "Respiratory System"),
    dc("6847", "Sleep Apnea (Obstructive)", "4", "97", "Respiratory System"),
    dc("6600", "Bronchitis (Chronic)", "4", "97", "Respiratory System"),
    dc("6845", "Restrictive Lung Disease", "4", "97", "Respiratory System"),
    dc("5201", "Arm (Limitation of Motion)", "4", "71a", "Musculoskeletal System"),
    dc("5003", "Arthritis (Degenerative)", "4", "71a", "Musculoskeletal System"),
    dc("5010", "Arthritis (Traumatic)", "4", "71a", "Musculoskeletal System"),
    dc("5237", "Lumbosacral Strain", "4", "71a", "Musculoskeletal System"),
    dc(
        "5242",
        "Degenerative Arthritis of the Spine",
        "4",
        "71a",
        "Musculoskeletal System",
    ),
    dc(
        "5243",
        "Intervertebral Disc Syndrome (IVDS)",
        "4",
        "71a",
        "Musculoskeletal System",
    ),
    dc("5260", "Leg (Limitation of Flexion)", "4", "71a", "Musculoskeletal System"),
    dc("5261", "Leg (Limitation of Extension)", "4", "71a", "Musculoskeletal System"),
    dc("5271", "Ankle (Limited Motion)", "4", "71a", "Musculoskeletal System"),
    dc("8045", "Traumatic Brain Injury (TBI)", "4", "124a", "Neurological Conditions"),
    dc("8100", "Migraine Headaches", "4", "124a", "Neurological Conditions"),
    dc("8520", "Sciatic Nerve (Paralysis)", "4", "124a", "Neurological Conditions"),
    dc("8515", "Median Nerve (Paralysis)", "4", "124a", "Neurological Conditions"),
    dc("8516", "Ulnar Nerve (Paralysis)", "4", "124a", "Neurological Conditions"),
    dc(
        "8510",
        "Upper Radicular Group (Paralysis)",
        "4",
        "124a",
        "Neurological Conditions",
    ),
    dc("6100", "Hearing Loss (Bilateral)", "4", "85", "Ear"),
    dc("6260", "Tinnitus", "4", "87", "Ear"),
    dc("7005", "Coronary Artery Disease", "4", "104", "Cardiovascular System"),
    dc("7101", "Hypertension", "4", "104", "Cardiovascular System"),
    dc("7110", "Aortic Aneurysm", "4", "104", "Cardiovascular System"),
    dc("7806", "Dermatitis/Eczema", "4", "118", "Skin"),
    dc("7800", "Burn Scars (Head/Face/Neck)", "4", "118", "Skin"),
    dc("7801", "Burn Scars (Other)", "4", "118", "Skin"),
    dc("7804", "Unstable/Painful Scars", "4", "118", "Skin"),
    dc("7346", "GERD (Hiatal Hernia)", "4", "114", "Digestive System"),
    dc("7319", "Irritable Bowel Syndrome (IBS)", "4", "114", "Digestive System"),
    dc("7323", "Ulcerative Colitis", "4", "114", "Digestive System"),
    dc("7913", "Diabetes Mellitus (Type II)", "4", "119", "Endocrine System"),
    dc("7900", "Hyperthyroidism", "4", "119", "Endocrine System"),
    dc(
        "7528",
        "Malignant Neoplasms (Genitourinary)",
        "4",
        "115a",
        "Genitourinary System",
    ),
    dc("7522", "Erectile Dysfunction", "4", "115a", "Genitourinary System"),
    dc("6066", "Visual Acuity Loss", "4", "79", "Eye"),
    dc("9905", "TMJ (Temporomandibular)", "4", "150", "Dental and Oral Conditions"),
    dc("7629", "Endometriosis", "4", "116", "Gynecological Conditions"),
    dc("6354", "Chronic Fatigue Syndrome", "4", "88b", "Infectious Diseases"),
    dc("7702", "Agranulocytosis", "4", "117", "Hemic and Lymphatic Systems"),
    dc(
        "8863",
        "Gulf War Undiagnosed Illness",
        "3",
        "317",
        "Undiagnosed Illness (38 CFR 3.317)",
    ),
];

static BY_CODE: LazyLock<HashMap<&'static str, &'static DiagnosticCode>> = LazyLock::new(|| {
    DIAGNOSTIC_CODES
        .iter()
        .map(|entry| (entry.code, entry))
        .collect()
});

pub fn lookup(code: &str) -> Option<&'static DiagnosticCode> {
    BY_CODE.get(code).copied()
}

/// Case-insensitive substring search over condition names, for reverse
/// lookup from a condition description to its diagnostic codes.
pub fn find_by_condition(query: &str) -> Vec<&'static DiagnosticCode> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    DIAGNOSTIC_CODES
        .iter()
        .filter(|entry| entry.condition.to_lowercase().contains(&needle))
        .collect()
}

/// Sorted unique section ids for one CFR part. Drives Part 4 ingestion,
/// where the sections worth indexing are exactly those the table cites.
pub fn sections_for_part(part: &str) -> Vec<&'static str> {
    let mut sections: Vec<&'static str> = DIAGNOSTIC_CODES
        .iter()
        .filter(|entry| entry.part == part)
        .map(|entry| entry.section)
        .collect();
    sections.sort_unstable();
    sections.dedup();
    sections
}

/// Schedule name from any table entry citing the given part and section.
pub fn schedule_for(part: &str, section: &str) -> Option<&'static str> {
    DIAGNOSTIC_CODES
        .iter()
        .find(|entry| entry.part == part && entry.section == section)
        .map(|entry| entry.schedule)
}
