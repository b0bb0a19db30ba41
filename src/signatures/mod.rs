//! Deterministic signature rules over service metadata and payload text.
//!
//! Rules are grouped by service (SSH, HTTP, FTP, SMTP). Several rules may fire for one event;
//! their weights add up into the rule-risk score. Unknown services never match.

use crate::events::{Event, ServiceMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SQL_INJECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(UNION|SELECT|DROP|INSERT|DELETE|UPDATE|--)").expect("sqli regex"));
static XSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(<script>|javascript:|onerror=|onload=)").expect("xss regex"));
static PATH_TRAVERSAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.\./|\.\.\\)").expect("traversal regex"));
static FTP_RETR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bRETR\b").expect("retr regex"));

const SSH_COMMAND_LIMIT: u64 = 20;
const HTTP_URL_LIMIT: u64 = 50;
const FTP_EXFIL_BYTES: u64 = 5000;
const SMTP_LARGE_BYTES: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signature {
    SshAuthFailure,
    SshHighActivity,
    HttpSqlInjection,
    HttpXssAttempt,
    HttpPathTraversal,
    HttpScannerBehavior,
    FtpDataExfiltration,
    SmtpLargePayload,
}

impl Signature {
    pub fn id(self) -> &'static str {
        match self {
            Signature::SshAuthFailure => "SSH_AUTH_FAILURE",
            Signature::SshHighActivity => "SSH_HIGH_ACTIVITY",
            Signature::HttpSqlInjection => "HTTP_SQL_INJECTION",
            Signature::HttpXssAttempt => "HTTP_XSS_ATTEMPT",
            Signature::HttpPathTraversal => "HTTP_PATH_TRAVERSAL",
            Signature::HttpScannerBehavior => "HTTP_SCANNER_BEHAVIOR",
            Signature::FtpDataExfiltration => "FTP_DATA_EXFILTRATION",
            Signature::SmtpLargePayload => "SMTP_LARGE_PAYLOAD",
        }
    }

    /// Risk added when the rule fires
    pub fn weight(self) -> u32 {
        match self {
            Signature::SshAuthFailure => 20,
            Signature::SshHighActivity => 30,
            Signature::HttpSqlInjection => 100,
            Signature::HttpXssAttempt => 80,
            Signature::HttpPathTraversal => 80,
            Signature::HttpScannerBehavior => 30,
            Signature::FtpDataExfiltration => 60,
            Signature::SmtpLargePayload => 40,
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMatch {
    pub signatures: Vec<Signature>,
    pub risk: u32,
}

impl SignatureMatch {
    fn push(&mut self, sig: Signature) {
        self.signatures.push(sig);
        self.risk += sig.weight();
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.signatures.iter().map(|s| s.id()).collect()
    }

    pub fn contains(&self, sig: Signature) -> bool {
        self.signatures.contains(&sig)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureEngine;

impl SignatureEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, event: &Event) -> SignatureMatch {
        let mut out = SignatureMatch::default();
        let Some(service) = event.service_type() else {
            return out;
        };
        let empty = ServiceMetadata::default();
        let meta = event.metadata.as_ref().unwrap_or(&empty);
        let payload = meta.payload.as_deref().unwrap_or("");
        let payload_size = meta.payload_size.unwrap_or(0);

        match service.trim().to_ascii_uppercase().as_str() {
            "SSH" => {
                if meta
                    .status
                    .as_deref()
                    .is_some_and(|s| s.trim().eq_ignore_ascii_case("failed"))
                {
                    out.push(Signature::SshAuthFailure);
                }
                if meta.command_count.unwrap_or(0) > SSH_COMMAND_LIMIT {
                    out.push(Signature::SshHighActivity);
                }
            }
            "HTTP" => {
                if SQL_INJECTION.is_match(payload) {
                    out.push(Signature::HttpSqlInjection);
                }
                if XSS.is_match(payload) {
                    out.push(Signature::HttpXssAttempt);
                }
                if PATH_TRAVERSAL.is_match(payload) {
                    out.push(Signature::HttpPathTraversal);
                }
                if meta.url_count.unwrap_or(0) > HTTP_URL_LIMIT {
                    out.push(Signature::HttpScannerBehavior);
                }
            }
            "FTP" => {
                if FTP_RETR.is_match(payload) && payload_size > FTP_EXFIL_BYTES {
                    out.push(Signature::FtpDataExfiltration);
                }
            }
            "SMTP" => {
                if payload_size > SMTP_LARGE_BYTES {
                    out.push(Signature::SmtpLargePayload);
                }
            }
            _ => {}
        }
        out
    }
}
