//! Ambient Hadoop configuration.
//!
//! Hadoop clusters describe themselves through `core-site.xml` and
//! `hdfs-site.xml`. Only the flattened `name -> value` view matters here;
//! property metadata such as `<final>` or `<description>` is ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use xmlparser::{ElementEnd, Token, Tokenizer};

use crate::error::ConfigError;

pub const HADOOP_CONF_DIR: &str = "HADOOP_CONF_DIR";
pub const HADOOP_HOME: &str = "HADOOP_HOME";

/// Files read from a configuration directory, later ones overriding.
pub const CONF_FILES: [&str; 2] = ["core-site.xml", "hdfs-site.xml"];

pub const KEY_AUTHENTICATION: &str = "hadoop.security.authentication";
pub const KEY_NAMENODE_PRINCIPAL: &str = "dfs.namenode.kerberos.principal";
pub const KEY_USE_DATANODE_HOSTNAME: &str = "dfs.client.use.datanode.hostname";
pub const KEY_REPLICATION: &str = "dfs.replication";
pub const KEY_BLOCK_SIZE: &str = "dfs.blocksize";

pub const DEFAULT_REPLICATION: u16 = 3;
pub const DEFAULT_BLOCK_SIZE: u64 = 128 * 1024 * 1024;

/// Flat, key-sorted view of the cluster configuration.
///
/// Keys are kept ordered so that every "first key with prefix" lookup is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HadoopConf {
    props: BTreeMap<String, String>,
}

impl HadoopConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.props.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.props
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A copy of this configuration with `overrides` layered on top.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> HadoopConf {
        let mut merged = self.clone();
        for (k, v) in overrides {
            merged.props.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Every namenode RPC address in the configuration, sorted.
    pub fn namenodes(&self) -> Vec<String> {
        let mut nns: Vec<String> = self
            .with_prefix(crate::namenode::RPC_ADDRESS_PREFIX)
            .map(|(_, v)| v.to_string())
            .collect();
        nns.sort();
        nns.dedup();
        nns
    }

    pub fn kerberos_enabled(&self) -> bool {
        self.get(KEY_AUTHENTICATION)
            .map(|v| v.trim().eq_ignore_ascii_case("kerberos"))
            .unwrap_or(false)
    }

    pub fn use_datanode_hostname(&self) -> bool {
        self.get(KEY_USE_DATANODE_HOSTNAME)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// The namenode service principal with its realm stripped, e.g.
    /// `nn/_HOST@EXAMPLE.COM` becomes `nn/_HOST`.
    pub fn namenode_principal(&self) -> Option<String> {
        let value = self.get(KEY_NAMENODE_PRINCIPAL)?.trim();
        let service = value.split('@').next().unwrap_or(value);
        if service.is_empty() {
            None
        } else {
            Some(service.to_string())
        }
    }

    pub fn replication(&self) -> Result<u16, ConfigError> {
        match self.get(KEY_REPLICATION) {
            None => Ok(DEFAULT_REPLICATION),
            Some(v) => v
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: KEY_REPLICATION.into(),
                    value: v.into(),
                }),
        }
    }

    pub fn block_size(&self) -> Result<u64, ConfigError> {
        match self.get(KEY_BLOCK_SIZE) {
            None => Ok(DEFAULT_BLOCK_SIZE),
            Some(v) => parse_size(v)
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: KEY_BLOCK_SIZE.into(),
                    value: v.into(),
                }),
        }
    }

    /// Merge the properties of one `*-site.xml` document.
    pub fn merge_xml(&mut self, text: &str) -> Result<(), String> {
        for (name, value) in parse_properties(text)? {
            self.props.insert(name, value);
        }
        Ok(())
    }

    /// Load every known file present in `dir`.
    ///
    /// Returns `Ok(None)` when the directory holds none of them.
    pub fn load_dir(dir: &Path) -> Result<Option<HadoopConf>, ConfigError> {
        let mut conf = HadoopConf::new();
        let mut found = false;
        for file in CONF_FILES {
            let path = dir.join(file);
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(ConfigError::Io { path, source }),
            };
            conf.merge_xml(&text)
                .map_err(|message| ConfigError::Xml { path: path.clone(), message })?;
            tracing::debug!(path = %path.display(), "loaded hadoop configuration file");
            found = true;
        }
        Ok(found.then_some(conf))
    }

    /// Candidate configuration directories, most specific first.
    pub fn candidate_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(dir) = std::env::var_os(HADOOP_CONF_DIR).filter(|d| !d.is_empty()) {
            dirs.push(PathBuf::from(dir));
        }
        if let Some(home) = std::env::var_os(HADOOP_HOME).filter(|d| !d.is_empty()) {
            let home = PathBuf::from(home);
            dirs.push(home.join("conf"));
            dirs.push(home.join("etc").join("hadoop"));
        }
        dirs
    }

    /// Load from the first candidate directory that holds a configuration
    /// file. No directory at all yields an empty configuration.
    pub fn load_from_environment() -> Result<(HadoopConf, Option<PathBuf>), ConfigError> {
        for dir in Self::candidate_dirs() {
            if let Some(conf) = Self::load_dir(&dir)? {
                return Ok((conf, Some(dir)));
            }
        }
        Ok((HadoopConf::new(), None))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HadoopConf {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut conf = HadoopConf::new();
        for (k, v) in iter {
            conf.set(k, v);
        }
        conf
    }
}

/// Parse a size with an optional binary suffix (`k`, `m`, `g`, `t`, `p`).
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let (digits, shift) = match value.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => {
            let shift = match c.to_ascii_lowercase() {
                'k' => 10,
                'm' => 20,
                'g' => 30,
                't' => 40,
                'p' => 50,
                _ => return None,
            };
            (&value[..i], shift)
        }
        _ => (value, 0),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(1u64 << shift)
}

fn parse_properties(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut name: Option<String> = None;
    let mut value: Option<String> = None;

    for token in Tokenizer::from(text) {
        match token.map_err(|e| e.to_string())? {
            Token::ElementStart { local, .. } => {
                if local.as_str() == "property" {
                    name = None;
                    value = None;
                }
                path.push(local.as_str().to_string());
                buf.clear();
            }
            Token::ElementEnd { end, .. } => match end {
                ElementEnd::Open => {}
                ElementEnd::Empty => {
                    // <value/> is an explicit empty value.
                    if path.pop().as_deref() == Some("value") {
                        value = Some(String::new());
                    }
                }
                ElementEnd::Close(_, local) => {
                    path.pop();
                    let in_property = path.last().map(String::as_str) == Some("property");
                    match local.as_str() {
                        "name" if in_property => name = Some(buf.trim().to_string()),
                        "value" if in_property => value = Some(buf.trim().to_string()),
                        "property" => {
                            if let Some(n) = name.take().filter(|n| !n.is_empty()) {
                                out.push((n, value.take().unwrap_or_default()));
                            }
                        }
                        _ => {}
                    }
                    buf.clear();
                }
            },
            Token::Text { text } => buf.push_str(&decode_entities(text.as_str())),
            Token::Cdata { text, .. } => buf.push_str(text.as_str()),
            _ => {}
        }
    }
    Ok(out)
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .unwrap_or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const CORE_SITE: &str = r#"<?xml version="1.0"?>
<?xml-stylesheet type="text/xsl" href="configuration.xsl"?>
<configuration>
  <!-- cluster entry point -->
  <property>
    <name>fs.defaultFS</name>
    <value>hdfs://ns1</value>
  </property>
  <property>
    <name>hadoop.security.authentication</name>
    <value>kerberos</value>
    <final>true</final>
  </property>
</configuration>
"#;

    const HDFS_SITE: &str = r#"<configuration>
  <property><name>dfs.namenode.rpc-address.ns1.nn2</name><value>hostB:8020</value></property>
  <property><name>dfs.namenode.rpc-address.ns1.nn1</name><value>hostA:8020</value></property>
  <property><name>dfs.replication</name><value> 2 </value></property>
  <property><name>dfs.blocksize</name><value>64m</value></property>
  <property><name>custom.escaped</name><value>a &amp; b &lt;c&gt; &#65;</value></property>
  <property><name>custom.empty</name><value/></property>
  <property><name>fs.defaultFS</name><value>hdfs://ns2</value></property>
</configuration>
"#;

    #[test]
    fn test_merge_xml() {
        let mut conf = HadoopConf::new();
        conf.merge_xml(CORE_SITE).unwrap();
        assert_eq!(conf.get("fs.defaultFS"), Some("hdfs://ns1"));
        assert!(conf.kerberos_enabled());
        assert_eq!(conf.len(), 2);
    }

    #[test]
    fn test_entities_and_empty_values() {
        let mut conf = HadoopConf::new();
        conf.merge_xml(HDFS_SITE).unwrap();
        assert_eq!(conf.get("custom.escaped"), Some("a & b <c> A"));
        assert_eq!(conf.get("custom.empty"), Some(""));
    }

    #[test]
    fn test_malformed_xml() {
        let mut conf = HadoopConf::new();
        assert!(conf.merge_xml("<configuration><<").is_err());
        assert!(conf.is_empty());
    }

    #[test]
    fn test_load_dir_later_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core-site.xml"), CORE_SITE).unwrap();
        std::fs::write(dir.path().join("hdfs-site.xml"), HDFS_SITE).unwrap();

        let conf = HadoopConf::load_dir(dir.path()).unwrap().unwrap();
        assert_eq!(conf.get("fs.defaultFS"), Some("hdfs://ns2"));
        assert_eq!(conf.replication().unwrap(), 2);
        assert_eq!(conf.block_size().unwrap(), 64 * 1024 * 1024);
        assert_eq!(conf.namenodes(), vec!["hostA:8020", "hostB:8020"]);
    }

    #[test]
    fn test_load_dir_without_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HadoopConf::load_dir(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_dir_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core-site.xml"), "<configuration><</configuration>").unwrap();
        let err = HadoopConf::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Xml { .. }));
    }

    #[test]
    #[serial]
    fn test_load_from_environment() {
        let home = tempfile::tempdir().unwrap();
        let etc = home.path().join("etc").join("hadoop");
        std::fs::create_dir_all(&etc).unwrap();
        std::fs::write(etc.join("core-site.xml"), CORE_SITE).unwrap();

        std::env::remove_var(HADOOP_CONF_DIR);
        std::env::set_var(HADOOP_HOME, home.path());
        let (conf, dir) = HadoopConf::load_from_environment().unwrap();
        std::env::remove_var(HADOOP_HOME);

        assert_eq!(dir, Some(etc));
        assert_eq!(conf.get("fs.defaultFS"), Some("hdfs://ns1"));
    }

    #[test]
    #[serial]
    fn test_load_from_empty_environment() {
        std::env::remove_var(HADOOP_CONF_DIR);
        std::env::remove_var(HADOOP_HOME);
        let (conf, dir) = HadoopConf::load_from_environment().unwrap();
        assert!(conf.is_empty());
        assert!(dir.is_none());
    }

    #[test]
    fn test_with_prefix_is_ordered_and_bounded() {
        let conf: HadoopConf = [
            ("fs.defaultFS", "hdfs://b"),
            ("fs.default.name", "hdfs://a"),
            ("fs.trash.interval", "0"),
            ("dfs.replication", "1"),
        ]
        .into_iter()
        .collect();
        let keys: Vec<&str> = conf.with_prefix("fs.default").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["fs.default.name", "fs.defaultFS"]);
    }

    #[test]
    fn test_defaults_and_invalid_values() {
        let conf = HadoopConf::new();
        assert_eq!(conf.replication().unwrap(), DEFAULT_REPLICATION);
        assert_eq!(conf.block_size().unwrap(), DEFAULT_BLOCK_SIZE);
        assert!(!conf.kerberos_enabled());

        let conf: HadoopConf = [("dfs.replication", "zero"), ("dfs.blocksize", "12x")]
            .into_iter()
            .collect();
        assert!(conf.replication().is_err());
        assert!(conf.block_size().is_err());
    }

    #[test]
    fn test_namenode_principal() {
        let conf: HadoopConf = [("dfs.namenode.kerberos.principal", "nn/_HOST@EXAMPLE.COM")]
            .into_iter()
            .collect();
        assert_eq!(conf.namenode_principal().as_deref(), Some("nn/_HOST"));
        assert_eq!(HadoopConf::new().namenode_principal(), None);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024"), Some(1024));
        assert_eq!(parse_size("128m"), Some(128 << 20));
        assert_eq!(parse_size("1G"), Some(1 << 30));
        assert_eq!(parse_size("4 k"), Some(4096));
        assert_eq!(parse_size("m"), None);
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("3q"), None);
    }

    #[test]
    fn test_with_overrides() {
        let base: HadoopConf = [("a", "1"), ("b", "2")].into_iter().collect();
        let mut overrides = BTreeMap::new();
        overrides.insert("b".to_string(), "3".to_string());
        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("3"));
        assert_eq!(base.get("b"), Some("2"));
    }
}
