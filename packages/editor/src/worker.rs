//! Parse job submission seam.
//!
//! Parsing runs behind [`ParseJobExecutor`] so callers do not care where
//! the work happens. The in-process executor simply loops over the files;
//! an out-of-process pool implements the same trait.

use reframe_parser::{parse_code, ParseFailure, ParseSuccess};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One file to parse, with enough metadata to correlate the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseFile {
    pub filename: String,
    pub contents: String,
    /// Millisecond timestamp of the content revision being parsed.
    pub last_modified: u64,
}

pub fn parse_file(
    filename: impl Into<String>,
    contents: impl Into<String>,
    last_modified: u64,
) -> ParseFile {
    ParseFile {
        filename: filename.into(),
        contents: contents.into(),
        last_modified,
    }
}

/// Outcome of one submitted job, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParseJobResult {
    ParseFileResult {
        filename: String,
        last_modified: u64,
        parse_result: Result<ParseSuccess, ParseFailure>,
    },
}

/// Something that can run parse jobs. Results come back in the order the
/// files were submitted.
pub trait ParseJobExecutor {
    fn submit_parse_job(&self, files: Vec<ParseFile>) -> Vec<ParseJobResult>;
}

/// Executor that parses on the calling thread.
#[derive(Debug, Default)]
pub struct LocalParseExecutor;

impl LocalParseExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ParseJobExecutor for LocalParseExecutor {
    fn submit_parse_job(&self, files: Vec<ParseFile>) -> Vec<ParseJobResult> {
        files
            .into_iter()
            .map(|file| {
                debug!(filename = %file.filename, "running parse job");
                let parse_result = parse_code(&file.filename, &file.contents);
                ParseJobResult::ParseFileResult {
                    filename: file.filename,
                    last_modified: file.last_modified,
                    parse_result,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_executor_returns_results_in_order() {
        let executor = LocalParseExecutor::new();
        let results = executor.submit_parse_job(vec![
            parse_file("/a.js", "export var A = (props) => <div data-uid={'aaa'} />\n", 1),
            parse_file("/b.js", "export var B = (props) => <div data-uid={", 2),
        ]);
        assert_eq!(results.len(), 2);
        match &results[0] {
            ParseJobResult::ParseFileResult {
                filename,
                parse_result,
                ..
            } => {
                assert_eq!(filename, "/a.js");
                assert!(parse_result.is_ok());
            }
        }
        match &results[1] {
            ParseJobResult::ParseFileResult { parse_result, .. } => {
                assert!(parse_result.is_err());
            }
        }
    }

    // The parsed tree is Arc-shared, so results must serialize through the
    // shared handles intact.
    #[test]
    fn test_parse_job_result_serializes_and_deserializes() {
        let executor = LocalParseExecutor::new();
        let results = executor.submit_parse_job(vec![parse_file(
            "/a.js",
            "export var A = (props) => (\n  <div data-uid={'aaa'}>\n    <span data-uid={'bbb'} />\n  </div>\n)\n",
            7,
        )]);
        let json = serde_json::to_string(&results[0]).expect("serialize");
        let restored: ParseJobResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, results[0]);
    }
}
