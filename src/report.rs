//! Report model and XML rendering
//!
//! The report lists every discovered suite and test with its source
//! location, in a shape third-party tooling built for Google Test XML
//! accepts as-is. All counts are derived from the children at render
//! time — there is nothing to keep consistent by hand.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::Serialize;

use crate::error::{Error, Result};

/// Fixed name Google Test gives the report root.
const ROOT_NAME: &str = "AllTests";

/// One test case entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    /// Test name.
    pub name: String,
    /// Path of the script the test was discovered in.
    pub file: String,
    /// Line where the test body was defined.
    pub line: u32,
}

/// One suite and its cases.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    name: String,
    cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// Create a suite entry.
    pub fn new(name: String, cases: Vec<CaseReport>) -> SuiteReport {
        SuiteReport { name, cases }
    }

    /// Suite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of cases — always `cases().len()`.
    pub fn test_count(&self) -> usize {
        self.cases.len()
    }

    /// The suite's cases.
    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }
}

/// The whole report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    suites: Vec<SuiteReport>,
}

impl Report {
    /// Create a report from suite entries.
    pub fn new(suites: Vec<SuiteReport>) -> Report {
        Report { suites }
    }

    /// The report's suites.
    pub fn suites(&self) -> &[SuiteReport] {
        &self.suites
    }

    /// Total test count — always the sum of the suite counts.
    pub fn total_tests(&self) -> usize {
        self.suites.iter().map(SuiteReport::test_count).sum()
    }

    /// Render the report as a Google Test compatible XML document.
    /// Writing the bytes anywhere is the caller's business.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(Error::report)?;

        let total = self.total_tests().to_string();
        let mut root = BytesStart::new("testsuites");
        root.push_attribute(("tests", total.as_str()));
        root.push_attribute(("name", ROOT_NAME));
        writer
            .write_event(Event::Start(root))
            .map_err(Error::report)?;

        for suite in &self.suites {
            let count = suite.test_count().to_string();
            let mut element = BytesStart::new("testsuite");
            element.push_attribute(("name", suite.name.as_str()));
            element.push_attribute(("tests", count.as_str()));
            writer
                .write_event(Event::Start(element))
                .map_err(Error::report)?;
            for case in &suite.cases {
                let line = case.line.to_string();
                let mut testcase = BytesStart::new("testcase");
                testcase.push_attribute(("name", case.name.as_str()));
                testcase.push_attribute(("file", case.file.as_str()));
                testcase.push_attribute(("line", line.as_str()));
                writer
                    .write_event(Event::Empty(testcase))
                    .map_err(Error::report)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("testsuite")))
                .map_err(Error::report)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("testsuites")))
            .map_err(Error::report)?;
        String::from_utf8(writer.into_inner()).map_err(Error::report)
    }
}
