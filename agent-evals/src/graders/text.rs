// Copyright 2025 AgentEvals (https://github.com/agent-evals)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Text graders: substring, equality, regex, and safety-keyword checks.

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput};
use async_trait::async_trait;

use crate::{ConfigError, Grader, GraderContext};

fn output_text(output: &TargetOutput) -> &str {
    output.text.as_deref().unwrap_or_default()
}

/// Passes when the output text contains a substring
///
/// Case-insensitive by default. An empty needle always passes; an empty
/// haystack fails any non-empty needle.
pub struct Contains {
    needle: String,
    case_sensitive: bool,
    name: String,
}

impl Contains {
    pub fn new(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self {
            name: format!("contains({needle:?})"),
            needle,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

fn find_substring(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if needle.is_empty() {
        return true;
    }
    if case_sensitive {
        haystack.contains(needle)
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[async_trait]
impl Grader for Contains {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let text = output_text(output);
        if self.needle.is_empty() {
            return GradeResult::pass(&self.name, "empty needle matches any output");
        }
        if find_substring(text, &self.needle, self.case_sensitive) {
            GradeResult::pass(&self.name, format!("output contains {:?}", self.needle))
        } else {
            GradeResult::fail(
                &self.name,
                format!("output does not contain {:?}", self.needle),
            )
        }
    }
}

/// Passes when the output text does NOT contain a substring
///
/// Empty output text passes trivially.
pub struct NotContains {
    needle: String,
    case_sensitive: bool,
    name: String,
}

impl NotContains {
    pub fn new(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self {
            name: format!("notContains({needle:?})"),
            needle,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

#[async_trait]
impl Grader for NotContains {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let text = output_text(output);
        if text.is_empty() {
            return GradeResult::pass(&self.name, "output text is empty");
        }
        if find_substring(text, &self.needle, self.case_sensitive) {
            GradeResult::fail(&self.name, format!("output contains {:?}", self.needle))
        } else {
            GradeResult::pass(
                &self.name,
                format!("output does not contain {:?}", self.needle),
            )
        }
    }
}

/// Passes when the output text equals an expected string
///
/// Trims surrounding whitespace by default; case-sensitive by default.
pub struct ExactMatch {
    expected: String,
    trim: bool,
    case_sensitive: bool,
    name: String,
}

impl ExactMatch {
    pub fn new(expected: impl Into<String>) -> Self {
        let expected = expected.into();
        Self {
            name: format!("exactMatch({expected:?})"),
            expected,
            trim: true,
            case_sensitive: true,
        }
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

#[async_trait]
impl Grader for ExactMatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let mut actual = output_text(output).to_string();
        let mut wanted = self.expected.clone();
        if self.trim {
            actual = actual.trim().to_string();
            wanted = wanted.trim().to_string();
        }
        if !self.case_sensitive {
            actual = actual.to_lowercase();
            wanted = wanted.to_lowercase();
        }
        if actual == wanted {
            GradeResult::pass(&self.name, "output matches exactly")
        } else {
            GradeResult::fail(
                &self.name,
                format!("expected {:?}, got {:?}", wanted, actual),
            )
        }
    }
}

/// Passes when the output text matches a regular expression
///
/// The pattern is compiled eagerly: an invalid pattern is a configuration
/// error, never a grading-time failure.
pub struct RegexMatch {
    regex: regex::Regex,
    name: String,
}

impl RegexMatch {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Self::with_flags(pattern, "")
    }

    /// Compile with flags: `i` (case-insensitive), `m` (multi-line),
    /// `s` (dot matches newline), `x` (verbose)
    pub fn with_flags(pattern: &str, flags: &str) -> Result<Self, ConfigError> {
        let mut builder = regex::RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(ConfigError::InvalidRegexFlag {
                        flags: flags.to_string(),
                        flag: other,
                    })
                }
            };
        }
        let regex = builder.build().map_err(|source| ConfigError::InvalidRegex {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })?;
        let name = if flags.is_empty() {
            format!("regex({pattern:?})")
        } else {
            format!("regex({pattern:?}, {flags})")
        };
        Ok(Self { regex, name })
    }
}

#[async_trait]
impl Grader for RegexMatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let text = output_text(output);
        if self.regex.is_match(text) {
            GradeResult::pass(&self.name, "pattern matched")
        } else {
            GradeResult::fail(&self.name, "pattern did not match output text")
        }
    }
}

/// Fails when any of a list of keywords appears in the output text
///
/// Matching is case-insensitive. The score is the fraction of keywords that
/// stayed absent, so a single violation out of many still shows how close
/// the output came.
pub struct SafetyKeywords {
    keywords: Vec<String>,
    name: String,
}

impl SafetyKeywords {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            name: format!("safetyKeywords([{}])", keywords.join(", ")),
            keywords,
        }
    }
}

#[async_trait]
impl Grader for SafetyKeywords {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let text = output_text(output).to_lowercase();
        let found: Vec<&str> = self
            .keywords
            .iter()
            .filter(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
            .map(|k| k.as_str())
            .collect();

        if found.is_empty() {
            GradeResult::pass(&self.name, "no safety keywords present")
        } else {
            let score = if self.keywords.is_empty() {
                0.0
            } else {
                (self.keywords.len() - found.len()) as f64 / self.keywords.len() as f64
            };
            GradeResult::scored(
                &self.name,
                false,
                score,
                format!("safety keywords present: {}", found.join(", ")),
            )
        }
    }
}
