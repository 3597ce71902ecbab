//! Quote of the day

use chrono::{Datelike, NaiveDate, Utc};

pub const QUOTES: [&str; 20] = [
    "Leaving is the start of something better.",
    "Every ending is the first step of a new journey.",
    "Step out of your comfort zone and the future gets interesting.",
    "Saying goodbye is not giving up, it is making room for more.",
    "Quitting can be loyalty to your own dreams.",
    "Life is a book of stamps; make the pages your own.",
    "Behind every turn is a wider sky.",
    "Courage is the finest stamp of all.",
    "New chances begin right now.",
    "Let go of the past and embrace the unknown.",
    "Leaving a job is not the end, it is the start of a better life.",
    "Put down what does not fit to hold what truly belongs to you.",
    "Every departure takes the courage to be responsible for yourself.",
    "A resignation is a gift of a fresh start.",
    "Do not fear leaving; you always keep the right to choose again.",
    "Leave the comfort zone and meet a better version of yourself.",
    "Walking away shows you what you really want from life.",
    "Release the past so the future can shine brighter.",
    "Moving on is part of growing; welcome the next challenge.",
    "The courage to leave is the first step towards the dream.",
];

/// Deterministic pick for a calendar date: `(y*10000 + m*100 + d) % len`
pub fn quote_for_date(date: NaiveDate) -> &'static str {
    let seed = date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64;
    let idx = seed.rem_euclid(QUOTES.len() as i64) as usize;
    QUOTES[idx]
}

/// Today's quote (UTC calendar day)
pub fn daily_quote() -> &'static str {
    quote_for_date(Utc::now().date_naive())
}
