//! Personal data detectors.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
}

impl PiiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiKind::Email      => "email",
            PiiKind::Phone      => "phone",
            PiiKind::Ssn        => "ssn",
            PiiKind::CreditCard => "credit_card",
            PiiKind::IpAddress  => "ip_address",
        }
    }
}

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b").expect("email pattern compiles");
    static ref PHONE: Regex =
        Regex::new(r"(?:\+?1[\-.\s]?)?(?:\(\d{3}\)|\b\d{3})[\-.\s]?\d{3}[\-.\s]?\d{4}\b").expect("phone pattern compiles");
    static ref SSN: Regex =
        Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn pattern compiles");
    static ref CARD: Regex =
        Regex::new(r"\b(?:\d[ \-]?){12,15}\d\b").expect("card pattern compiles");
    static ref IPV4: Regex = Regex::new(
        r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b"
    )
    .expect("ipv4 pattern compiles");
}

/// Matched substrings per kind. Empty when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PiiReport {
    matches: BTreeMap<PiiKind, Vec<String>>,
}

impl PiiReport {
    pub fn has_pii(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn kinds(&self) -> Vec<PiiKind> {
        self.matches.keys().copied().collect()
    }

    pub fn matches(&self, kind: PiiKind) -> &[String] {
        self.matches.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn add(&mut self, kind: PiiKind, found: Vec<String>) {
        if !found.is_empty() {
            self.matches.insert(kind, found);
        }
    }
}

fn find_all(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

fn luhn_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

pub fn detect_pii(text: &str) -> PiiReport {
    let mut report = PiiReport::default();

    report.add(PiiKind::Email, find_all(&EMAIL, text));
    report.add(PiiKind::Ssn, find_all(&SSN, text));
    report.add(PiiKind::Phone, find_all(&PHONE, text));

    let cards = CARD
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|candidate| {
            let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
            (13..=16).contains(&digits.len()) && luhn_valid(&digits)
        })
        .map(str::to_string)
        .collect();
    report.add(PiiKind::CreditCard, cards);

    report.add(PiiKind::IpAddress, find_all(&IPV4, text));
    report
}
