//! Startup check of the configured field names against real status output.
//!
//! Purely advisory: unknown fields are reported but stay in the configured
//! list, fetching always filters with what the operator asked for.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::parser::{self, LineParser};
use crate::source::StatusSource;

/// Outcome of checking the configured fields once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedParameterSet {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

impl ValidatedParameterSet {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Every name an operator could configure against this output.
pub fn candidate_names<P: LineParser>(parser: &P, output: &str) -> BTreeSet<String> {
    parser::lines(output)
        .filter_map(|line| parser.candidate_name(line))
        .collect()
}

/// Splits `fields` into those present in `output` and those absent, logging each.
pub fn check_fields<P: LineParser>(parser: &P, output: &str, fields: &[String]) -> ValidatedParameterSet {
    let candidates = candidate_names(parser, output);
    let mut result = ValidatedParameterSet::default();

    for field in fields {
        if candidates.contains(field) {
            debug!("Parameter \"{}\" found.", field);
            result.found.push(field.clone());
        } else {
            warn!("Parameter \"{}\" not found; ignoring.", field);
            result.missing.push(field.clone());
        }
    }

    result
}

/// Queries `source` once and checks `fields` against it.
///
/// A failing source is returned as an error; the caller treats it as fatal.
pub async fn validate<S, P>(source: &S, parser: &P, fields: &[String]) -> Result<ValidatedParameterSet>
where
    S: StatusSource,
    P: LineParser,
{
    let output = source.dump().await?;
    Ok(check_fields(parser, &output, fields))
}
