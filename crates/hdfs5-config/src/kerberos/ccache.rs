//! Reader for MIT `FILE:` credential caches (format versions 3 and 4).
//!
//! All integers are big-endian. Version 4 carries a tagged header that is
//! skipped; version 3 repeats the key enctype inside every keyblock.

use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};

use super::KerberosError;

pub const VERSION_3: u16 = 0x0503;
pub const VERSION_4: u16 = 0x0504;

/// Realm used by MIT for cache configuration entries, not real tickets.
const CONFIG_REALM: &str = "X-CACHECONF:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalName {
    pub name_type: u32,
    pub realm: String,
    pub components: Vec<String>,
}

impl PrincipalName {
    /// First component, the user part of `user/instance@REALM`.
    pub fn primary(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }

    fn is_tgs_for(&self, realm: &str) -> bool {
        self.realm == realm
            && self.components.len() == 2
            && self.components[0] == "krbtgt"
            && self.components[1] == realm
    }
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.components.join("/"), self.realm)
    }
}

/// One cached ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTicket {
    pub client: PrincipalName,
    pub server: PrincipalName,
    pub key_enctype: u16,
    pub key: Vec<u8>,
    pub auth_time: u32,
    pub start_time: u32,
    pub end_time: u32,
    pub renew_till: u32,
    pub is_skey: bool,
    pub ticket_flags: u32,
    pub ticket: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CCache {
    pub version: u16,
    pub default_principal: PrincipalName,
    pub tickets: Vec<CachedTicket>,
}

impl CCache {
    pub fn load(path: &Path) -> Result<Self, KerberosError> {
        let bytes = std::fs::read(path).map_err(|source| KerberosError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, KerberosError> {
        let mut r = Reader {
            cur: Cursor::new(bytes),
        };
        let version = r.u16()?;
        if version != VERSION_3 && version != VERSION_4 {
            return Err(KerberosError::UnsupportedCCacheVersion(version));
        }
        if version == VERSION_4 {
            let header_len = r.u16()? as usize;
            r.skip(header_len)?;
        }

        let default_principal = r.principal()?;
        let mut tickets = Vec::new();
        while !r.at_end() {
            tickets.push(r.ticket(version)?);
        }

        Ok(Self {
            version,
            default_principal,
            tickets,
        })
    }

    /// The ticket-granting ticket for `realm`, preferring the one that
    /// expires last.
    pub fn tgt(&self, realm: &str) -> Option<&CachedTicket> {
        self.tickets
            .iter()
            .filter(|t| t.server.realm != CONFIG_REALM && t.server.is_tgs_for(realm))
            .max_by_key(|t| t.end_time)
    }
}

struct Reader<'a> {
    cur: Cursor<&'a [u8]>,
}

impl Reader<'_> {
    fn remaining(&self) -> usize {
        let len = self.cur.get_ref().len() as u64;
        len.saturating_sub(self.cur.position()) as usize
    }

    fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn u8(&mut self) -> Result<u8, KerberosError> {
        self.cur.read_u8().map_err(truncated)
    }

    fn u16(&mut self) -> Result<u16, KerberosError> {
        self.cur.read_u16::<BigEndian>().map_err(truncated)
    }

    fn u32(&mut self) -> Result<u32, KerberosError> {
        self.cur.read_u32::<BigEndian>().map_err(truncated)
    }

    fn skip(&mut self, n: usize) -> Result<(), KerberosError> {
        if n > self.remaining() {
            return Err(KerberosError::CCacheFormat("truncated header".into()));
        }
        self.cur.set_position(self.cur.position() + n as u64);
        Ok(())
    }

    fn octets(&mut self) -> Result<Vec<u8>, KerberosError> {
        let len = self.u32()? as usize;
        if len > self.remaining() {
            return Err(KerberosError::CCacheFormat(format!(
                "field of {} bytes exceeds remaining {}",
                len,
                self.remaining()
            )));
        }
        let mut buf = vec![0u8; len];
        self.cur.read_exact(&mut buf).map_err(truncated)?;
        Ok(buf)
    }

    fn string(&mut self) -> Result<String, KerberosError> {
        String::from_utf8(self.octets()?)
            .map_err(|_| KerberosError::CCacheFormat("principal is not valid UTF-8".into()))
    }

    fn principal(&mut self) -> Result<PrincipalName, KerberosError> {
        let name_type = self.u32()?;
        let count = self.u32()? as usize;
        let realm = self.string()?;
        // Every component needs at least its 4-byte length.
        if count > self.remaining() / 4 {
            return Err(KerberosError::CCacheFormat("bad component count".into()));
        }
        let components = (0..count)
            .map(|_| self.string())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PrincipalName {
            name_type,
            realm,
            components,
        })
    }

    fn ticket(&mut self, version: u16) -> Result<CachedTicket, KerberosError> {
        let client = self.principal()?;
        let server = self.principal()?;
        let key_enctype = self.u16()?;
        if version == VERSION_3 {
            self.u16()?;
        }
        let key = self.octets()?;
        let auth_time = self.u32()?;
        let start_time = self.u32()?;
        let end_time = self.u32()?;
        let renew_till = self.u32()?;
        let is_skey = self.u8()? != 0;
        let ticket_flags = self.u32()?;

        let addresses = self.u32()?;
        for _ in 0..addresses {
            self.u16()?;
            self.octets()?;
        }
        let authdata = self.u32()?;
        for _ in 0..authdata {
            self.u16()?;
            self.octets()?;
        }

        let ticket = self.octets()?;
        // Second ticket, only used for user-to-user.
        self.octets()?;

        Ok(CachedTicket {
            client,
            server,
            key_enctype,
            key,
            auth_time,
            start_time,
            end_time,
            renew_till,
            is_skey,
            ticket_flags,
            ticket,
        })
    }
}

fn truncated(_: std::io::Error) -> KerberosError {
    KerberosError::CCacheFormat("unexpected end of credential cache".into())
}

#[cfg(test)]
pub(crate) mod fixture {
    use byteorder::{BigEndian, WriteBytesExt};

    /// Builds credential cache bytes for tests.
    pub struct CCacheBuilder {
        version: u16,
        buf: Vec<u8>,
    }

    impl CCacheBuilder {
        pub fn new(version: u16, principal: &[&str], realm: &str) -> Self {
            let mut b = Self {
                version,
                buf: Vec::new(),
            };
            b.buf.write_u16::<BigEndian>(version).unwrap();
            if version == super::VERSION_4 {
                // One kdc time-offset tag: tag(2) len(2) data(8).
                b.buf.write_u16::<BigEndian>(12).unwrap();
                b.buf.write_u16::<BigEndian>(1).unwrap();
                b.buf.write_u16::<BigEndian>(8).unwrap();
                b.buf.extend_from_slice(&[0u8; 8]);
            }
            b.principal(principal, realm);
            b
        }

        fn octets(&mut self, data: &[u8]) {
            self.buf.write_u32::<BigEndian>(data.len() as u32).unwrap();
            self.buf.extend_from_slice(data);
        }

        fn principal(&mut self, components: &[&str], realm: &str) {
            self.buf.write_u32::<BigEndian>(1).unwrap();
            self.buf
                .write_u32::<BigEndian>(components.len() as u32)
                .unwrap();
            self.octets(realm.as_bytes());
            for c in components {
                self.octets(c.as_bytes());
            }
        }

        pub fn ticket(
            mut self,
            client: &[&str],
            server: &[&str],
            realm: &str,
            end_time: u32,
        ) -> Self {
            self.principal(client, realm);
            self.principal(server, realm);
            self.buf.write_u16::<BigEndian>(18).unwrap();
            if self.version == super::VERSION_3 {
                self.buf.write_u16::<BigEndian>(18).unwrap();
            }
            self.octets(&[7u8; 32]);
            for t in [1_000u32, 1_000, end_time, end_time] {
                self.buf.write_u32::<BigEndian>(t).unwrap();
            }
            self.buf.write_u8(0).unwrap();
            self.buf.write_u32::<BigEndian>(0x4000_0000).unwrap();
            // One address, no authdata.
            self.buf.write_u32::<BigEndian>(1).unwrap();
            self.buf.write_u16::<BigEndian>(2).unwrap();
            self.octets(&[10, 0, 0, 1]);
            self.buf.write_u32::<BigEndian>(0).unwrap();
            self.octets(b"ticket-bytes");
            self.octets(b"");
            self
        }

        pub fn build(self) -> Vec<u8> {
            self.buf
        }
    }
}
