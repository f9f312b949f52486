//! Archive access over SSH + SFTP.
//!
//! `ssh2` is blocking; callers run everything here on a blocking thread.

use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ssh2::{CheckResult, KnownHostFileKind, Session, Sftp};
use tracing::{debug, info, warn};

use hunter_core::config::RemoteConfig;
use hunter_core::IngestError;

use crate::archive::ArchiveReader;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// How the server's host key is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept whatever key the server presents. Logged as a warning on every connect.
    AcceptAny,
    /// Require a matching entry in an OpenSSH known_hosts file.
    KnownHosts(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSource {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub private_key: PathBuf,
    pub host_keys: HostKeyPolicy,
}

impl From<&RemoteConfig> for RemoteSource {
    fn from(cfg: &RemoteConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            user: cfg.user.clone(),
            private_key: cfg.private_key.clone(),
            host_keys: match &cfg.known_hosts {
                Some(path) => HostKeyPolicy::KnownHosts(path.clone()),
                None => HostKeyPolicy::AcceptAny,
            },
        }
    }
}

/// An authenticated SFTP channel. Disconnects when dropped.
pub struct SftpArchive {
    session: Session,
    sftp: Option<Sftp>,
}

impl SftpArchive {
    pub fn connect(source: &RemoteSource) -> Result<Self, IngestError> {
        let host = source.host.clone();
        let addr = (source.host.as_str(), source.port)
            .to_socket_addrs()
            .map_err(|e| IngestError::Connect {
                host: host.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| IngestError::Connect {
                host: host.clone(),
                reason: "no addresses resolved".into(),
            })?;

        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(|e| {
            IngestError::Connect {
                host: host.clone(),
                reason: e.to_string(),
            }
        })?;

        let handshake_err = |e: ssh2::Error| IngestError::Handshake {
            host: host.clone(),
            reason: e.to_string(),
        };
        let mut session = Session::new().map_err(handshake_err)?;
        session.set_tcp_stream(tcp);
        session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
        session.handshake().map_err(handshake_err)?;

        verify_host_key(&session, source)?;

        session
            .userauth_pubkey_file(&source.user, None, &source.private_key, None)
            .map_err(|e| IngestError::Auth {
                user: source.user.clone(),
                reason: e.to_string(),
            })?;
        if !session.authenticated() {
            return Err(IngestError::Auth {
                user: source.user.clone(),
                reason: "server did not accept the key".into(),
            });
        }

        let sftp = session
            .sftp()
            .map_err(|e| IngestError::Sftp(e.to_string()))?;
        info!(host = %source.host, user = %source.user, "sftp session established");

        Ok(Self {
            session,
            sftp: Some(sftp),
        })
    }
}

fn verify_host_key(session: &Session, source: &RemoteSource) -> Result<(), IngestError> {
    let reject = |reason: String| IngestError::HostKey {
        host: source.host.clone(),
        reason,
    };

    match &source.host_keys {
        HostKeyPolicy::AcceptAny => {
            warn!(
                host = %source.host,
                "accepting unverified ssh host key; set SSH_KNOWN_HOSTS to pin it"
            );
            Ok(())
        }
        HostKeyPolicy::KnownHosts(path) => {
            let mut known = session.known_hosts().map_err(|e| reject(e.to_string()))?;
            known
                .read_file(path, KnownHostFileKind::OpenSSH)
                .map_err(|e| reject(format!("cannot read {}: {e}", path.display())))?;
            let (key, _) = session
                .host_key()
                .ok_or_else(|| reject("server presented no host key".into()))?;
            match known.check_port(&source.host, source.port, key) {
                CheckResult::Match => Ok(()),
                CheckResult::Mismatch => Err(reject("key does not match known_hosts".into())),
                CheckResult::NotFound => Err(reject("host not in known_hosts".into())),
                CheckResult::Failure => Err(reject("known_hosts check failed".into())),
            }
        }
    }
}

impl ArchiveReader for SftpArchive {
    fn size(&mut self, path: &Path) -> Option<u64> {
        self.sftp.as_ref()?.stat(path).ok()?.size
    }

    fn open(&mut self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let sftp = self
            .sftp
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sftp closed"))?;
        let file = sftp.open(path).map_err(io::Error::from)?;
        Ok(Box::new(file))
    }
}

impl Drop for SftpArchive {
    fn drop(&mut self) {
        // Channel must close before the session.
        self.sftp.take();
        if let Err(e) = self.session.disconnect(None, "ingestion complete", None) {
            debug!(error = %e, "ssh disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use super::*;

    fn source(port: u16) -> RemoteSource {
        RemoteSource {
            host: "127.0.0.1".into(),
            port,
            user: "root".into(),
            private_key: PathBuf::from("/nonexistent/key"),
            host_keys: HostKeyPolicy::AcceptAny,
        }
    }

    #[test]
    fn policy_from_config() {
        let mut cfg = RemoteConfig {
            host: "10.0.0.1".into(),
            port: 22,
            user: "root".into(),
            private_key: PathBuf::from(".ssh/key"),
            known_hosts: None,
        };
        assert_eq!(RemoteSource::from(&cfg).host_keys, HostKeyPolicy::AcceptAny);

        cfg.known_hosts = Some(PathBuf::from("/etc/ssh/known_hosts"));
        assert_eq!(
            RemoteSource::from(&cfg).host_keys,
            HostKeyPolicy::KnownHosts(PathBuf::from("/etc/ssh/known_hosts"))
        );
    }

    #[test]
    fn refused_connection_is_connect_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = SftpArchive::connect(&source(port)).err().unwrap();
        assert_eq!(err.error_kind(), "connect");
    }

    #[test]
    fn non_ssh_peer_fails_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
            }
        });

        let err = SftpArchive::connect(&source(port)).err().unwrap();
        assert_eq!(err.error_kind(), "handshake");
        server.join().unwrap();
    }

    #[test]
    fn unresolvable_host_is_connect_error() {
        let mut src = source(22);
        src.host = "host.invalid".into();
        let err = SftpArchive::connect(&src).err().unwrap();
        assert!(matches!(err, IngestError::Connect { .. }));
    }
}
