//! Compliance predicate.

use crate::types::{CompliancePolicy, ComplianceResult, PostureFacts};

/// Evaluate facts against a policy.
///
/// A device is compliant only when all enabled checks pass; every failing
/// enabled check is listed in `violations`.
pub fn evaluate(facts: &PostureFacts, policy: &CompliancePolicy) -> ComplianceResult {
    let mut enabled = 0u32;
    let mut violations = Vec::new();

    for check in policy.enabled_checks() {
        enabled += 1;
        if !check.passes(facts) {
            violations.push(check.violation().to_string());
        }
    }

    let passed = enabled - violations.len() as u32;
    let compliance_score = if enabled == 0 {
        100
    } else {
        ((passed * 100) / enabled) as u8
    };

    ComplianceResult {
        is_compliant: violations.is_empty(),
        compliance_score,
        violations,
    }
}
