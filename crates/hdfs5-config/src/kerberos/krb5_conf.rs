//! Reader for the MIT `krb5.conf` format.
//!
//! Only the sections a client needs to locate its realm are interpreted:
//! `[libdefaults]`, `[realms]` and `[domain_realm]`. Other sections are
//! parsed for well-formedness and dropped.

use std::collections::BTreeMap;
use std::path::Path;

use super::KerberosError;

/// KDC locations of one realm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Realm {
    pub kdcs: Vec<String>,
    pub admin_servers: Vec<String>,
    pub default_domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Krb5Config {
    pub libdefaults: BTreeMap<String, String>,
    pub realms: BTreeMap<String, Realm>,
    pub domain_realm: BTreeMap<String, String>,
}

enum Section {
    LibDefaults,
    Realms,
    DomainRealm,
    Other,
}

impl Krb5Config {
    pub fn load(path: &Path) -> Result<Self, KerberosError> {
        let text = std::fs::read_to_string(path).map_err(|source| KerberosError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, KerberosError> {
        let mut config = Krb5Config::default();
        let mut section: Option<Section> = None;
        // Realm whose `{ ... }` block is open, plus the depth of nested
        // blocks inside it that are being skipped.
        let mut open_realm: Option<String> = None;
        let mut depth = 0usize;
        let mut other_depth = 0usize;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() || line.starts_with("include") || line.starts_with("module") {
                continue;
            }

            if line == "}" {
                if depth > 0 {
                    depth -= 1;
                } else if other_depth > 0 {
                    other_depth -= 1;
                } else if open_realm.take().is_none() {
                    return Err(parse_error(lineno, "unbalanced '}'"));
                }
                continue;
            }

            // Nested blocks hold values (auth_to_local rules and the like)
            // that are not interpreted; only their braces are tracked.
            if depth > 0 || other_depth > 0 {
                if line.ends_with('{') {
                    if open_realm.is_some() {
                        depth += 1;
                    } else {
                        other_depth += 1;
                    }
                }
                continue;
            }

            if line.starts_with('[') {
                if open_realm.is_some() {
                    return Err(parse_error(lineno, "section header inside an open block"));
                }
                let name = line
                    .strip_prefix('[')
                    .and_then(|l| l.strip_suffix(']'))
                    .ok_or_else(|| parse_error(lineno, "unterminated section header"))?
                    .trim();
                section = Some(match name {
                    "libdefaults" => Section::LibDefaults,
                    "realms" => Section::Realms,
                    "domain_realm" => Section::DomainRealm,
                    _ => Section::Other,
                });
                continue;
            }

            let Some(current) = section.as_ref() else {
                return Err(parse_error(lineno, "relation outside of any section"));
            };

            let (key, value) = line
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| parse_error(lineno, "expected 'key = value'"))?;
            if key.is_empty() {
                return Err(parse_error(lineno, "empty key"));
            }
            let opens_block = value == "{";

            if let Some(realm) = open_realm.as_ref() {
                if opens_block {
                    depth += 1;
                    continue;
                }
                let entry = config.realms.entry(realm.clone()).or_default();
                match key {
                    "kdc" => entry.kdcs.push(value.to_string()),
                    "admin_server" => entry.admin_servers.push(value.to_string()),
                    "default_domain" => entry.default_domain = Some(value.to_string()),
                    _ => {}
                }
                continue;
            }

            match current {
                Section::Realms if opens_block => {
                    config.realms.entry(key.to_string()).or_default();
                    open_realm = Some(key.to_string());
                }
                Section::Realms => {
                    return Err(parse_error(lineno, "realm definition must open a block"));
                }
                _ if opens_block => other_depth += 1,
                Section::LibDefaults => {
                    config.libdefaults.insert(key.to_string(), value.to_string());
                }
                Section::DomainRealm => {
                    config.domain_realm.insert(key.to_string(), value.to_string());
                }
                Section::Other => {}
            }
        }

        if open_realm.is_some() || depth > 0 || other_depth > 0 {
            return Err(parse_error(text.lines().count(), "unterminated block"));
        }
        Ok(config)
    }

    pub fn default_realm(&self) -> Option<&str> {
        self.libdefaults.get("default_realm").map(String::as_str)
    }

    pub fn realm(&self, name: &str) -> Option<&Realm> {
        self.realms.get(name)
    }

    /// Realm mapped to `host` by `[domain_realm]`, trying the exact host
    /// first and then each parent domain (`.example.com`).
    pub fn realm_for_host(&self, host: &str) -> Option<&str> {
        let host = host.to_ascii_lowercase();
        if let Some(realm) = self.domain_realm.get(&host) {
            return Some(realm);
        }
        let mut rest = host.as_str();
        while let Some(pos) = rest.find('.') {
            if let Some(realm) = self.domain_realm.get(&rest[pos..]) {
                return Some(realm);
            }
            rest = &rest[pos + 1..];
        }
        None
    }
}

fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        ""
    } else {
        line
    }
}

fn parse_error(line: usize, message: &str) -> KerberosError {
    KerberosError::Krb5Conf {
        line,
        message: message.to_string(),
    }
}
