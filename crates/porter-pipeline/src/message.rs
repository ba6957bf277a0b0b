//! Outcome message composition.
//!
//! Clients branch on these strings, so they are built from a fixed set of
//! clauses rather than free-form formatting. Fixity failures and
//! unevaluated checks produce distinct clauses; an unevaluated check is
//! not a failure.

use porter_core::types::FixityResult;

/// Running tally of per-file fixity outcomes for one job phase.
#[derive(Debug, Clone, Default)]
pub struct FixityTally {
    /// Relative paths whose check mismatched.
    pub failed: Vec<String>,
    /// Number of files whose check could not be evaluated.
    pub indeterminate: usize,
}

impl FixityTally {
    /// Fold one file's result into the tally.
    pub fn record(&mut self, relative_path: &str, result: &FixityResult) {
        if result.is_failure() {
            self.failed.push(relative_path.to_string());
        } else if result.is_indeterminate() {
            self.indeterminate += 1;
        }
    }

    /// Whether any check mismatched.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Whether any check went unevaluated.
    pub fn has_indeterminate(&self) -> bool {
        self.indeterminate > 0
    }
}

fn qualified(action: &str, tally: &FixityTally) -> String {
    if tally.has_failures() {
        format!("{action} successful, but with fixity errors.")
    } else if tally.has_indeterminate() {
        format!("{action} successful, but fixity could not be evaluated for every file.")
    } else {
        format!("{action} successful.")
    }
}

/// Final message of a download job.
pub fn download_message(tally: &FixityTally) -> String {
    qualified("Download", tally)
}

/// Final message of an upload job.
pub fn upload_message(tally: &FixityTally) -> String {
    qualified("Upload", tally)
}

/// Final message of a transfer job, covering both sides and the
/// provenance log state.
///
/// Each combination of failing sides gets its own string; clients branch
/// on the exact text, so download-only, upload-only, and both-sides
/// failures must stay distinguishable.
pub fn transfer_message(
    download: &FixityTally,
    upload: &FixityTally,
    metadata_valid: bool,
) -> String {
    let mut message = match (download.has_failures(), upload.has_failures()) {
        (true, true) => {
            "Transfer successful, but with fixity errors during the download and the upload."
                .to_string()
        }
        (true, false) => {
            "Transfer successful, but with fixity errors during the download.".to_string()
        }
        (false, true) => {
            "Transfer successful, but with fixity errors during the upload.".to_string()
        }
        (false, false) => {
            if download.has_indeterminate() || upload.has_indeterminate() {
                "Transfer successful, but fixity could not be evaluated for every file."
                    .to_string()
            } else {
                "Transfer successful.".to_string()
            }
        }
    };
    if !metadata_valid {
        message.push_str(" The existing transfer metadata file was invalid and a new log was started.");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(failed: &[&str], indeterminate: usize) -> FixityTally {
        FixityTally {
            failed: failed.iter().map(|s| s.to_string()).collect(),
            indeterminate,
        }
    }

    #[test]
    fn test_clean_download() {
        assert_eq!(download_message(&tally(&[], 0)), "Download successful.");
    }

    #[test]
    fn test_failures_outrank_indeterminate() {
        assert_eq!(
            download_message(&tally(&["a.txt"], 2)),
            "Download successful, but with fixity errors."
        );
    }

    #[test]
    fn test_indeterminate_is_not_a_failure() {
        assert_eq!(
            upload_message(&tally(&[], 1)),
            "Upload successful, but fixity could not be evaluated for every file."
        );
    }

    #[test]
    fn test_transfer_names_the_failing_side() {
        assert_eq!(
            transfer_message(&tally(&["a.txt"], 0), &tally(&[], 0), true),
            "Transfer successful, but with fixity errors during the download."
        );
        assert_eq!(
            transfer_message(&tally(&[], 0), &tally(&["b.txt"], 0), true),
            "Transfer successful, but with fixity errors during the upload."
        );
        assert_eq!(
            transfer_message(&tally(&["a.txt"], 0), &tally(&["b.txt"], 0), true),
            "Transfer successful, but with fixity errors during the download and the upload."
        );
    }

    #[test]
    fn test_transfer_side_combinations_are_distinct() {
        let ok = tally(&[], 0);
        let bad = tally(&["x.txt"], 0);
        let messages = [
            transfer_message(&ok, &ok, true),
            transfer_message(&bad, &ok, true),
            transfer_message(&ok, &bad, true),
            transfer_message(&bad, &bad, true),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_transfer_indeterminate_side_degrades_message() {
        let message = transfer_message(&tally(&[], 1), &tally(&[], 0), true);
        assert_eq!(
            message,
            "Transfer successful, but fixity could not be evaluated for every file."
        );
    }

    #[test]
    fn test_invalid_metadata_appends_clause() {
        let message = transfer_message(&tally(&[], 0), &tally(&[], 0), false);
        assert_eq!(
            message,
            "Transfer successful. The existing transfer metadata file was invalid and a new log was started."
        );
    }
}
