//! Planned date windows embedded in a lot's transition text, e.g.
//! `"CORTE: 01/01/25 - 10/01/25 MONTAGEM: 13/01/25 - 24/01/25"`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::models::{Phase, WindowLabel};

const DATE: &str = r"(\d{2}/\d{2}/\d{2,4})";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone)]
pub struct WindowExtractor {
    range: Regex,
    single: Option<Regex>,
}

static EXTRACTORS: Lazy<HashMap<Phase, WindowExtractor>> = Lazy::new(|| {
    Phase::ALL
        .into_iter()
        .map(|phase| {
            let extractor = WindowExtractor::new(phase.window_label())
                .expect("window labels are escaped literals");
            (phase, extractor)
        })
        .collect()
});

impl WindowExtractor {
    pub fn new(label: WindowLabel) -> Result<Self, regex::Error> {
        let token = regex::escape(label.token);
        let token = if label.word_bounded {
            format!(r"\b{}\b", token)
        } else {
            token
        };

        let range = RegexBuilder::new(&format!(r"{}:\s*{}\s*-\s*{}", token, DATE, DATE))
            .case_insensitive(true)
            .build()?;
        let single = if label.single_date {
            Some(
                RegexBuilder::new(&format!(r"{}:\s*{}", token, DATE))
                    .case_insensitive(true)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { range, single })
    }

    pub fn for_phase(phase: Phase) -> &'static WindowExtractor {
        &EXTRACTORS[&phase]
    }

    /// Never fails: anything that is not a well-formed annotation yields an
    /// unset window.
    pub fn extract(&self, text: Option<&str>) -> DateWindow {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return DateWindow::default();
        };

        if let Some(caps) = self.range.captures(text) {
            return DateWindow::new(parse_day_first(&caps[1]), parse_day_first(&caps[2]));
        }

        if let Some(caps) = self.single.as_ref().and_then(|re| re.captures(text)) {
            let day = parse_day_first(&caps[1]);
            return DateWindow::new(day, day);
        }

        DateWindow::default()
    }
}

/// `dd/mm/yy` or `dd/mm/yyyy`; two-digit years are in the 2000s.
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}
