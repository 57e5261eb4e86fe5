use crate::utils::{Error, Result};
use std::{fmt, str::FromStr};

/// Genomic interval `contig[:begin[-end]]` with 1-based inclusive coordinates.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Region {
    pub contig: String,
    pub begin: Option<u64>,
    pub end: Option<u64>,
}

impl Region {
    pub fn new(contig: impl Into<String>, begin: Option<u64>, end: Option<u64>) -> Result<Self> {
        let contig = contig.into();
        let region = Self { contig, begin, end };
        region.validate()?;
        Ok(region)
    }

    pub fn contig(contig: impl Into<String>) -> Result<Self> {
        Self::new(contig, None, None)
    }

    pub fn from_string(encoding: &str) -> Result<Self> {
        let (contig, coords) = match encoding.split_once(':') {
            Some((contig, coords)) => (contig, Some(coords)),
            None => (encoding, None),
        };

        let (begin, end) = match coords {
            None => (None, None),
            Some(coords) => match coords.split_once('-') {
                Some((begin, end)) => (
                    Some(parse_coordinate(encoding, begin, "begin")?),
                    Some(parse_coordinate(encoding, end, "end")?),
                ),
                None => (Some(parse_coordinate(encoding, coords, "begin")?), None),
            },
        };

        Self::new(contig, begin, end).map_err(|e| match e {
            Error::RegionFormat { reason, .. } => Error::region_format(encoding, reason),
            other => other,
        })
    }

    fn validate(&self) -> Result<()> {
        let display = self.to_string();
        if self.contig.is_empty() || !self.contig.chars().all(is_word_char) {
            return Err(Error::region_format(
                &display,
                format!("contig '{}' must match \\w+", self.contig),
            ));
        }
        match (self.begin, self.end) {
            (Some(0), _) | (_, Some(0)) => Err(Error::region_format(
                &display,
                "coordinates are 1-based and must be positive",
            )),
            (None, Some(_)) => Err(Error::region_format(
                &display,
                "end requires a begin coordinate",
            )),
            (Some(begin), Some(end)) if begin > end => Err(Error::region_format(
                &display,
                format!("begin {} is greater than end {}", begin, end),
            )),
            _ => Ok(()),
        }
    }

    /// 0-based half-open window `[begin0, end)` as used by indexed fetches, `None` meaning contig end.
    pub fn zero_based_window(&self) -> (u64, Option<u64>) {
        (self.begin.map_or(0, |b| b - 1), self.end)
    }

    /// True if a record spanning the 0-based half-open interval `[start, stop)` overlaps the region.
    pub fn overlaps(&self, start: u64, stop: u64) -> bool {
        let (begin0, end) = self.zero_based_window();
        begin0 < stop && end.map_or(true, |end| start < end)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn parse_coordinate(encoding: &str, value: &str, name: &str) -> Result<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::region_format(
            encoding,
            format!("{} '{}' must be a positive integer", name, value),
        ));
    }
    value.parse().map_err(|_| {
        Error::region_format(encoding, format!("{} '{}' is out of range", name, value))
    })
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.contig)?;
        if let Some(begin) = self.begin {
            write!(f, ":{}", begin)?;
        }
        if let Some(end) = self.end {
            write!(f, "-{}", end)?;
        }
        Ok(())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}
