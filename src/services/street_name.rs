//! Street-name extraction from free-text strata addresses
//!
//! `extract_street_name` turns "UNIT 4 12A GEORGE STREET, SYDNEY" into
//! "GEORGE STREET": one pass strips a unit/level marker and a house number,
//! then the tokens are scanned from the right for a known street-type suffix.
//! Output is the canonical grouping key for street aggregation.
//!
//! Known quirk: a purely numeric token sitting right before the suffix
//! ("LOT 7 12-14 ROAD") stays in the name.

use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Returned for empty input
pub const UNKNOWN_EMPTY_INPUT: &str = "UNKNOWN ADDRESS (EMPTY INPUT)";
/// Returned when nothing is left after cleanup and no suffix was found
pub const UNKNOWN_NO_SUFFIX: &str = "UNKNOWN ADDRESS (NO SUFFIX AND EMPTY AFTER CLEAN)";

/// Street-type words and abbreviations (Australian + USPS forms).
/// Duplicates are harmless; the table is collected into a set.
const STREET_SUFFIXES: &[&str] = &[
    "ROAD", "STREET", "AVENUE", "PARADE", "PLACE", "CRESCENT", "CIRCUIT", "CLOSE", "COURT",
    "DRIVE", "ESPLANADE", "GROVE", "LANE", "LOOP", "MEWS", "RISE", "ROW", "SQUARE", "TERRACE",
    "WALK", "WAY", "CIR", "CL", "CRT", "CRES", "ESP", "GR", "PDE", "PL", "RD", "ST", "AVE", "DR",
    "WYND", "ALY", "ARC", "BVD", "CH", "CNR", "CSWY", "CUT", "GDNS", "HWY", "KY", "LINK", "MALL",
    "PROM", "RES", "RIDE", "SQ", "TCE", "TRL", "VIEW", "YARD", "RDGE", "PKWY", "PASS", "HTS",
    "GLEN", "DALE", "BRAE", "BANK", "BLVD", "BYPA", "BYWY", "CCT", "CDS", "CTR", "CON", "COVE",
    "CRSE", "DRWY", "EST", "FWY", "GRA", "KEY", "LDGE", "LK", "LKT", "PLZA", "PT", "QUAY", "RAMP",
    "RDG", "RDS", "RTE", "RUN", "SERV", "SPUR", "STRA", "TRFY", "TRK", "TUNL", "TURN", "VI",
    "VLLS", "VSTA", "WTRS", "CIRCL", "ESPL", "EXTN", "HIGHWY", "HILL", "HOLW", "JCT", "LNDG",
    "MNR", "MT", "PASSG", "PATH", "PIKE", "PLNS", "RNCH", "SHRS", "SPGS", "SQRE", "STA", "TER",
    "TPKE", "TRCE", "TRAK", "VIS", "VLY", "VWS", "WKWY", "XING", "ALLEE", "ANX", "ARCADE",
    "BAYOO", "BCH", "BEND", "BLF", "BLFS", "BTM", "BYP", "CANYN", "CAPE", "CAUSWAY", "CEN",
    "CNTR", "CNYN", "COR", "CORS", "CRK", "CURV", "CYN", "DL", "DM", "DV", "DRS", "ESTS", "EXP",
    "EXPY", "EXT", "EXTS", "FALL", "FLD", "FLDS", "FLT", "FLTS", "FRD", "FRDS", "FRK", "FRKS",
    "FRST", "FRY", "FT", "GTWY", "GV", "HARB", "HAVN", "HBR", "HGTS", "HIWY", "HL", "HLS", "HT",
    "HVN", "HYW", "INLT", "IS", "ISLE", "ISS", "JCTN", "KNL", "KNLS", "KYS", "LAND", "LCK",
    "LCKS", "LDG", "LF", "LGT", "LGTS", "LKS", "LN", "MDW", "MDWS", "ML", "MLS", "MNRS", "MSN",
    "MSSN", "MTIN", "MTN", "MTNS", "MTWY", "NCK", "OPAS", "ORCH", "OVL", "PARK", "PK", "PKY",
    "PKWYS", "PLN", "PLZ", "PNE", "PNES", "PORT", "PR", "PRT", "PRTS", "PSGE", "PTS", "RADL",
    "RDGS", "RIV", "RIVR", "RPD", "RPDS", "RST", "RT", "RUE", "SHL", "SHLS", "SHR", "SKWY", "SLP",
    "SMT", "SPG", "SQR", "SQRS", "SQS", "STAT", "STN", "STR", "STRM", "STRT", "STS", "SUMT",
    "TERR", "TR", "TRAF", "TRKS", "TRLS", "TRNPK", "TRWY", "UN", "UNS", "UPR", "VALY", "VDCT",
    "VIA", "VW", "VIL", "VILL", "VILLG", "VILLI", "VLG", "VLGS", "VLYS", "VSTS", "WY", "XRD",
    "XRDS",
];

static SUFFIX_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| STREET_SUFFIXES.iter().copied().collect());

/// One unit/level marker with its identifier, then one house number, each
/// with an optional trailing separator. A marker glued to a word ("LANE",
/// "UNDERWOOD") is not a marker: it must be followed by whitespace or a digit.
static PREFIX_CLEANUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*",
        r"(?:(?:UNIT|U|APT|SHOP|SUITE|STE|LEVEL|L|OFFICE|KIOSK|ROOM|RM|FLAT|FL)",
        r"(?:\s+\S+|\d\S*)\s*[/\\-]?\s*)?",
        r"(?:\d+\S*\s*[/\\-]?\s*)?",
    ))
    .expect("prefix cleanup pattern is valid")
});

/// Whether a token is a recognised street-type suffix
#[inline]
pub fn is_street_suffix(token: &str) -> bool {
    SUFFIX_SET.contains(token)
}

/// Strip the unit/level prefix and house number from an upper-cased address
fn strip_prefix(address_upper: &str) -> &str {
    match PREFIX_CLEANUP.find(address_upper) {
        Some(m) => address_upper[m.end()..].trim(),
        None => address_upper.trim(),
    }
}

/// Derive the canonical street name used to group buildings.
///
/// Total: every input yields a non-empty string, and the same input always
/// yields the same output.
pub fn extract_street_name(address: &str) -> String {
    if address.is_empty() {
        return UNKNOWN_EMPTY_INPUT.to_string();
    }

    let address_upper = address.to_uppercase();
    let address_upper = address_upper.trim();
    let cleaned = strip_prefix(address_upper);
    let search_base = if cleaned.is_empty() { address_upper } else { cleaned };

    let tokens: Vec<&str> =
        search_base.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()).collect();

    if let Some(idx) = tokens.iter().rposition(|t| is_street_suffix(t)) {
        return tokens[..=idx].join(" ");
    }

    let fallback = if search_base.is_empty() { UNKNOWN_NO_SUFFIX } else { search_base };
    debug!(address = %address, cleaned = %search_base, using = %fallback, "street_suffix_not_found");
    fallback.to_string()
}

/// Byte offset where `suffix` starts at the end of `haystack`, comparing
/// upper-cased characters
fn suffix_start_ignoring_case(haystack: &str, suffix: &str) -> Option<usize> {
    let mut chars = haystack.char_indices().rev();
    let mut start = haystack.len();
    for expected in suffix.chars().rev() {
        let (idx, c) = chars.next()?;
        if !c.to_uppercase().eq(expected.to_uppercase()) {
            return None;
        }
        start = idx;
    }
    Some(start)
}

/// Drop a trailing ", SUBURB" or " SUBURB" from an address (case-insensitive)
fn strip_trailing_suburb<'a>(address: &'a str, suburb: &str) -> &'a str {
    let suburb = suburb.trim();
    if suburb.is_empty() {
        return address;
    }
    let Some(start) = suffix_start_ignoring_case(address, suburb) else {
        return address;
    };
    // Cut offsets come from the original string, so they sit on char boundaries
    match address[..start].strip_suffix(' ') {
        Some(head) => head.strip_suffix(',').unwrap_or(head).trim(),
        None => address,
    }
}

/// Building address as shown in the building view: the record's address with
/// its trailing suburb removed, original casing kept
pub fn parse_display_address(address: &str, suburb: &str) -> String {
    strip_trailing_suburb(address, suburb).to_string()
}
