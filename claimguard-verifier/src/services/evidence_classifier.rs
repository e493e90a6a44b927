//! Evidence classifier
//!
//! Assigns a trust tier and a display name to retrieved evidence from the
//! URL's host alone. No I/O.
//!
//! Tiers, checked in order:
//! 1. Dedicated fact-checking organizations
//! 2. Government, academic and international institutions (plus `.gov`,
//!    `.edu`, `.eu` suffixes)
//! 3. Major news outlets and source-bias evaluators
//! 4. Social and user-generated platforms
//!
//! Unknown hosts default to tier 3.
//!
//! Table domains match whole host labels, so `news.bbc.co.uk` matches
//! `bbc.co.uk` while `notbbc.co.uk` and `x.com` inside `fox.com` do not.

use claimguard_common::Source;
use url::Url;

use crate::models::EvidenceItem;

pub const TIER_FACT_CHECKER: u8 = 1;
pub const TIER_INSTITUTION: u8 = 2;
pub const TIER_NEWS: u8 = 3;
pub const TIER_SOCIAL: u8 = 4;

const TIER_1_DOMAINS: &[&str] = &[
    // US IFCN signatories
    "politifact.com",
    "factcheck.org",
    "reuters.com",
    "apnews.com",
    "leadstories.com",
    "washingtonpost.com",
    "checkyourfact.com",
    "snopes.com",
    "poynter.org",
    "wisconsinwatch.org",
    "univision.com",
    "telemundo.com",
    // International IFCN signatories
    "factcheck.afp.com",
    "fullfact.org",
    "sciencefeedback.co",
    "africacheck.org",
    "dw.com",
    "correctiv.org",
    "maldita.es",
    "chequeado.com",
    "aosfatos.org",
    "lupa.news",
    "pesacheck.org",
    "stopfake.org",
    "voxukraine.org",
    "rappler.com",
    "thejournal.ie",
    "poligrafo.sapo.pt",
    "newtral.es",
    "faktisk.no",
    "ellinikahoaxes.gr",
    "teyit.org",
    "tfc-taiwan.org.tw",
    "factcheckcenter.jp",
];

const TIER_2_DOMAINS: &[&str] = &[
    "who.int",
    "arxiv.org",
    "nasa.gov",
    "cdc.gov",
    "nih.gov",
    "europa.eu",
    "whitehouse.gov",
    "congress.gov",
    "supremecourt.gov",
];

const TIER_2_SUFFIXES: &[&str] = &[".gov", ".edu", ".eu"];

const TIER_3_DOMAINS: &[&str] = &[
    "bbc.com",
    "bbc.co.uk",
    "nytimes.com",
    "wsj.com",
    "bloomberg.com",
    "aljazeera.com",
    "theguardian.com",
    "npr.org",
    // Source evaluators, not fact-checkers
    "mediabiasfactcheck.com",
    "allsides.com",
    "adfontesmedia.com",
    "ground.news",
];

const TIER_4_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "reddit.com",
    "twitter.com",
    "x.com",
    "medium.com",
    "quora.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "youtube.com",
];

const DOMAIN_NAMES: &[(&str, &str)] = &[
    ("snopes.com", "Snopes"),
    ("politifact.com", "PolitiFact"),
    ("factcheck.org", "FactCheck.org"),
    ("reuters.com", "Reuters"),
    ("apnews.com", "AP News"),
    ("leadstories.com", "Lead Stories"),
    ("washingtonpost.com", "Washington Post"),
    ("checkyourfact.com", "Check Your Fact"),
    ("poynter.org", "MediaWise"),
    ("wisconsinwatch.org", "Wisconsin Watch"),
    ("univision.com", "El Detector"),
    ("telemundo.com", "T Verifica"),
    ("factcheck.afp.com", "AFP Fact Check"),
    ("fullfact.org", "Full Fact"),
    ("sciencefeedback.co", "Science Feedback"),
    ("africacheck.org", "Africa Check"),
    ("dw.com", "DW Fact Check"),
    ("correctiv.org", "Correctiv"),
    ("maldita.es", "Maldita.es"),
    ("chequeado.com", "Chequeado"),
    ("aosfatos.org", "Aos Fatos"),
    ("lupa.news", "Lupa"),
    ("pesacheck.org", "PesaCheck"),
    ("stopfake.org", "StopFake"),
    ("voxukraine.org", "VoxUkraine"),
    ("rappler.com", "Rappler"),
    ("thejournal.ie", "TheJournal FactCheck"),
    ("poligrafo.sapo.pt", "Poligrafo"),
    ("newtral.es", "Newtral"),
    ("faktisk.no", "Faktisk"),
    ("ellinikahoaxes.gr", "Ellinika Hoaxes"),
    ("teyit.org", "Teyit"),
    ("tfc-taiwan.org.tw", "Taiwan FactCheck"),
    ("factcheckcenter.jp", "Japan Fact-Check"),
    ("who.int", "WHO"),
    ("arxiv.org", "arXiv"),
    ("nasa.gov", "NASA"),
    ("cdc.gov", "CDC"),
    ("nih.gov", "NIH"),
    ("bbc.com", "BBC"),
    ("bbc.co.uk", "BBC"),
    ("nytimes.com", "NY Times"),
    ("wsj.com", "WSJ"),
    ("bloomberg.com", "Bloomberg"),
    ("aljazeera.com", "Al Jazeera"),
    ("theguardian.com", "The Guardian"),
    ("npr.org", "NPR"),
    ("mediabiasfactcheck.com", "MBFC"),
    ("allsides.com", "AllSides"),
    ("adfontesmedia.com", "Ad Fontes"),
    ("ground.news", "Ground News"),
    ("wikipedia.org", "Wikipedia"),
    ("reddit.com", "Reddit"),
    ("twitter.com", "Twitter"),
    ("x.com", "X"),
    ("medium.com", "Medium"),
    ("quora.com", "Quora"),
    ("youtube.com", "YouTube"),
];

/// Lower-cased host with a leading `www.` removed
fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Whole-label match: `domain` equals `host` or is a dot-separated suffix of it
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn in_table(host: &str, table: &[&str]) -> bool {
    table.iter().any(|domain| host_matches(host, domain))
}

/// Trust tier (1-4) for a URL
///
/// Empty or unparseable URLs get tier 4.
pub fn classify(url: &str) -> u8 {
    let Some(host) = host_of(url) else {
        return TIER_SOCIAL;
    };

    if in_table(&host, TIER_1_DOMAINS) {
        TIER_FACT_CHECKER
    } else if in_table(&host, TIER_2_DOMAINS)
        || TIER_2_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
    {
        TIER_INSTITUTION
    } else if in_table(&host, TIER_3_DOMAINS) {
        TIER_NEWS
    } else if in_table(&host, TIER_4_DOMAINS) {
        TIER_SOCIAL
    } else {
        TIER_NEWS
    }
}

/// Display name for a URL
///
/// Known domains use the fixed name table, anything else the capitalized
/// second-level label. `fallback_title` is used only when the URL has no
/// usable host.
pub fn name_for(url: &str, fallback_title: &str) -> String {
    let Some(host) = host_of(url) else {
        return if fallback_title.trim().is_empty() {
            "Unknown".to_string()
        } else {
            fallback_title.to_string()
        };
    };

    if let Some((_, name)) = DOMAIN_NAMES
        .iter()
        .find(|(domain, _)| host_matches(&host, domain))
    {
        return (*name).to_string();
    }

    let labels: Vec<&str> = host.split('.').collect();
    let label = if labels.len() >= 2 {
        labels[labels.len() - 2]
    } else {
        host.as_str()
    };
    capitalize(label)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turn retrieved evidence into classified sources, preserving order
pub fn build_sources(evidence: &[EvidenceItem]) -> Vec<Source> {
    evidence
        .iter()
        .map(|item| Source {
            name: name_for(&item.url, &item.title),
            url: item.url.clone(),
            tier: classify(&item.url),
            snippet: item.snippet.clone(),
            body: item.body.clone(),
        })
        .collect()
}
