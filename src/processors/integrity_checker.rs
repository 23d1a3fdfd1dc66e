use crate::models::StarSchema;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub time_rows: usize,
    pub location_rows: usize,
    pub fact_rows: usize,
    pub violations: Vec<KeyViolation>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct KeyViolation {
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationType {
    SparseKey,
    DuplicateNaturalKey,
    UnorderedTime,
    OrphanFact,
}

/// Checks the key invariants of a built star schema.
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, schema: &StarSchema) -> IntegrityReport {
        let mut report = IntegrityReport {
            time_rows: schema.time_dim.len(),
            location_rows: schema.location_dim.len(),
            fact_rows: schema.facts.len(),
            violations: Vec::new(),
        };

        self.check_time_dimension(schema, &mut report);
        self.check_location_dimension(schema, &mut report);
        self.check_fact_references(schema, &mut report);

        report
    }

    fn check_time_dimension(&self, schema: &StarSchema, report: &mut IntegrityReport) {
        for (position, row) in schema.time_dim.iter().enumerate() {
            let expected = position as i64 + 1;
            if row.time_id != expected {
                report.violations.push(KeyViolation {
                    violation_type: ViolationType::SparseKey,
                    details: format!("time_id {} at position {}, expected {}", row.time_id, position, expected),
                });
            }
        }

        for window in schema.time_dim.windows(2) {
            let (prev, curr) = (&window[0], &window[1]);
            if prev.timestamp_hour == curr.timestamp_hour {
                report.violations.push(KeyViolation {
                    violation_type: ViolationType::DuplicateNaturalKey,
                    details: format!("hour {} appears more than once", curr.timestamp_hour),
                });
            } else if prev.timestamp_hour > curr.timestamp_hour {
                report.violations.push(KeyViolation {
                    violation_type: ViolationType::UnorderedTime,
                    details: format!(
                        "time_id {} ({}) precedes later hour {}",
                        curr.time_id, curr.timestamp_hour, prev.timestamp_hour
                    ),
                });
            }
        }
    }

    fn check_location_dimension(&self, schema: &StarSchema, report: &mut IntegrityReport) {
        let mut seen = HashSet::new();

        for (position, row) in schema.location_dim.iter().enumerate() {
            let expected = position as i64 + 1;
            if row.location_id != expected {
                report.violations.push(KeyViolation {
                    violation_type: ViolationType::SparseKey,
                    details: format!(
                        "location_id {} at position {}, expected {}",
                        row.location_id, position, expected
                    ),
                });
            }
            if !seen.insert(row.location_code.as_str()) {
                report.violations.push(KeyViolation {
                    violation_type: ViolationType::DuplicateNaturalKey,
                    details: format!("location code '{}' appears more than once", row.location_code),
                });
            }
        }
    }

    fn check_fact_references(&self, schema: &StarSchema, report: &mut IntegrityReport) {
        let time_ids: HashSet<i64> = schema.time_dim.iter().map(|t| t.time_id).collect();
        let location_ids: HashSet<i64> = schema.location_dim.iter().map(|l| l.location_id).collect();

        for (index, fact) in schema.facts.iter().enumerate() {
            if !time_ids.contains(&fact.time_id) || !location_ids.contains(&fact.location_id) {
                report.violations.push(KeyViolation {
                    violation_type: ViolationType::OrphanFact,
                    details: format!(
                        "fact {} references time_id {} / location_id {}",
                        index, fact.time_id, fact.location_id
                    ),
                });
            }
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Time Dimension Rows: {}\n", report.time_rows));
        summary.push_str(&format!("Location Dimension Rows: {}\n", report.location_rows));
        summary.push_str(&format!("Fact Rows: {}\n", report.fact_rows));
        summary.push_str(&format!("\nKey Violations: {}\n", report.violations.len()));

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {:?}: {}\n",
                    i + 1,
                    violation.violation_type,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}
