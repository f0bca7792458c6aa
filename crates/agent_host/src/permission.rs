//! Heuristic classification of failed runs.
//!
//! Everything here is substring matching on stderr. Signatures that are
//! not recognized (other locales, other tools) simply fall through and the
//! raw error is reported.

use crate::executor::ExecutionResult;

fn stderr_matches(result: &ExecutionResult, signatures: &[String]) -> bool {
    signatures
        .iter()
        .filter(|sig| !sig.is_empty())
        .any(|sig| result.stderr.contains(sig.as_str()))
}

/// A failed run whose stderr carries a privilege-denial signature.
pub fn needs_escalation(result: &ExecutionResult, denial_signatures: &[String]) -> bool {
    !result.success() && stderr_matches(result, denial_signatures)
}

/// The elevation helper refused to run without a credential.
pub fn requires_credential(result: &ExecutionResult, signatures: &[String]) -> bool {
    !result.success() && stderr_matches(result, signatures)
}

/// The elevation helper rejected the supplied credential.
pub fn credential_rejected(result: &ExecutionResult, signatures: &[String]) -> bool {
    stderr_matches(result, signatures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit_status: i32, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            exit_status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration_ms: 1,
        }
    }

    fn denial() -> Vec<String> {
        vec!["Permission denied".to_string()]
    }

    #[test]
    fn test_denial_on_failure_escalates() {
        let r = result(1, "cat: /etc/shadow: Permission denied\n");
        assert!(needs_escalation(&r, &denial()));
    }

    #[test]
    fn test_other_failures_do_not_escalate() {
        let r = result(1, "ls: cannot access 'nope': No such file or directory\n");
        assert!(!needs_escalation(&r, &denial()));
    }

    #[test]
    fn test_success_never_escalates() {
        // e.g. `find` printing denials for some dirs but exiting 0
        let r = result(0, "find: '/root': Permission denied\n");
        assert!(!needs_escalation(&r, &denial()));
    }

    #[test]
    fn test_only_configured_phrases_match() {
        let r = result(1, "Operation not permitted\n");
        assert!(!needs_escalation(&r, &denial()));
        assert!(needs_escalation(&r, &["Operation not permitted".to_string()]));
        assert!(!needs_escalation(&r, &[String::new()]));
    }

    #[test]
    fn test_credential_signatures() {
        let required = vec!["a password is required".to_string()];
        let r = result(1, "sudo: a password is required\n");
        assert!(requires_credential(&r, &required));
        assert!(!requires_credential(&result(0, ""), &required));

        let rejected = vec!["Sorry, try again".to_string()];
        let r = result(1, "Sorry, try again.\nsudo: 1 incorrect password attempt\n");
        assert!(credential_rejected(&r, &rejected));
    }
}
