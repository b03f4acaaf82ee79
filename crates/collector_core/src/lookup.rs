use crate::JobInput;

pub const LOOKUP_TYPE_TAG: &str = "CIDR";

/// One row of the CIDR lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRow {
    pub cidr: String,
    pub job_name: String,
    pub group_name: String,
}

impl LookupRow {
    /// `"<cidr>","<job>","<group>","CIDR","",""` without a line terminator.
    pub fn to_csv_line(&self) -> String {
        [
            self.cidr.as_str(),
            self.job_name.as_str(),
            self.group_name.as_str(),
            LOOKUP_TYPE_TAG,
            "",
            "",
        ]
        .iter()
        .map(|field| quote(field))
        .collect::<Vec<_>>()
        .join(",")
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Best-effort CIDR normalization.
///
/// Accepts anything whose address part has four non-empty dot-separated
/// components and appends `/32` when no prefix length is given. IPv6,
/// hostnames and junk return `None`. The prefix itself is not validated.
pub fn normalize_cidr(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (address, prefix) = match trimmed.split_once('/') {
        Some((address, prefix)) => (address, prefix.trim()),
        None => (trimmed, ""),
    };
    let address = address.trim();
    let components: Vec<&str> = address.split('.').collect();
    if components.len() != 4 || components.iter().any(|c| c.is_empty()) {
        return None;
    }
    let prefix = if prefix.is_empty() { "32" } else { prefix };
    Some(format!("{address}/{prefix}"))
}

/// Lookup rows for one job, de-duplicated by CIDR in first-seen order.
pub fn rows_for_job(group_name: &str, job_name: &str, input: &JobInput) -> Vec<LookupRow> {
    let mut rows: Vec<LookupRow> = Vec::new();
    for cidr in input.addresses().filter_map(normalize_cidr) {
        if rows.iter().any(|row| row.cidr == cidr) {
            continue;
        }
        rows.push(LookupRow {
            cidr,
            job_name: job_name.to_string(),
            group_name: group_name.to_string(),
        });
    }
    rows
}
