/*!
 * Static definitions of the BANCA evaluation protocols.
 *
 * The BANCA English part records twelve data sessions per subject: sessions
 * 1-4 under controlled conditions, 5-8 degraded, 9-12 adverse. Every
 * protocol fixes which sessions are used to enroll a model and which true
 * client accesses and informed impostor attacks are used as probes.
 */

use anyhow::anyhow;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Number of data sessions recorded per subject
pub const SESSION_COUNT: i64 = 12;

/// Number of shots (still images) kept per recorded access
pub const SHOT_COUNT: i64 = 5;

/// The seven BANCA evaluation protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Matched controlled
    Mc,
    /// Matched degraded
    Md,
    /// Matched adverse
    Ma,
    /// Unmatched degraded (controlled enrollment, degraded probes)
    Ud,
    /// Unmatched adverse (controlled enrollment, adverse probes)
    Ua,
    /// Pooled: controlled enrollment, probes from every condition
    P,
    /// Grand: enrollment and probes from every condition
    G,
}

impl Protocol {
    /// All registered protocols, in canonical order
    pub fn all() -> &'static [Protocol] {
        &[
            Protocol::Mc,
            Protocol::Md,
            Protocol::Ma,
            Protocol::Ud,
            Protocol::Ua,
            Protocol::P,
            Protocol::G,
        ]
    }

    /// The session table for this protocol
    pub fn definition(&self) -> &'static ProtocolDefinition {
        &PROTOCOL_DEFINITIONS[self]
    }

    /// Canonical protocol name as used in file lists and publications
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Mc => "Mc",
            Protocol::Md => "Md",
            Protocol::Ma => "Ma",
            Protocol::Ud => "Ud",
            Protocol::Ua => "Ua",
            Protocol::P => "P",
            Protocol::G => "G",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mc" => Ok(Protocol::Mc),
            "md" => Ok(Protocol::Md),
            "ma" => Ok(Protocol::Ma),
            "ud" => Ok(Protocol::Ud),
            "ua" => Ok(Protocol::Ua),
            "p" => Ok(Protocol::P),
            "g" => Ok(Protocol::G),
            _ => Err(anyhow!(
                "Invalid protocol: {}. Valid protocols are Mc, Md, Ma, Ud, Ua, P, G",
                s
            )),
        }
    }
}

/// Session table of a protocol
#[derive(Debug, Clone)]
pub struct ProtocolDefinition {
    /// Sessions whose true client accesses enroll the models
    pub enroll_sessions: &'static [i64],
    /// Sessions whose true client accesses are used as client probes
    pub client_probe_sessions: &'static [i64],
    /// Sessions whose impostor attacks are used as impostor probes
    pub impostor_probe_sessions: &'static [i64],
}

static PROTOCOL_DEFINITIONS: Lazy<HashMap<Protocol, ProtocolDefinition>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        Protocol::Mc,
        ProtocolDefinition {
            enroll_sessions: &[1],
            client_probe_sessions: &[2, 3, 4],
            impostor_probe_sessions: &[1, 2, 3, 4],
        },
    );
    m.insert(
        Protocol::Md,
        ProtocolDefinition {
            enroll_sessions: &[5],
            client_probe_sessions: &[6, 7, 8],
            impostor_probe_sessions: &[5, 6, 7, 8],
        },
    );
    m.insert(
        Protocol::Ma,
        ProtocolDefinition {
            enroll_sessions: &[9],
            client_probe_sessions: &[10, 11, 12],
            impostor_probe_sessions: &[9, 10, 11, 12],
        },
    );
    m.insert(
        Protocol::Ud,
        ProtocolDefinition {
            enroll_sessions: &[1],
            client_probe_sessions: &[6, 7, 8],
            impostor_probe_sessions: &[5, 6, 7, 8],
        },
    );
    m.insert(
        Protocol::Ua,
        ProtocolDefinition {
            enroll_sessions: &[1],
            client_probe_sessions: &[10, 11, 12],
            impostor_probe_sessions: &[9, 10, 11, 12],
        },
    );
    m.insert(
        Protocol::P,
        ProtocolDefinition {
            enroll_sessions: &[1],
            client_probe_sessions: &[2, 3, 4, 6, 7, 8, 10, 11, 12],
            impostor_probe_sessions: &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        },
    );
    m.insert(
        Protocol::G,
        ProtocolDefinition {
            enroll_sessions: &[1, 5, 9],
            client_probe_sessions: &[2, 3, 4, 6, 7, 8, 10, 11, 12],
            impostor_probe_sessions: &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        },
    );
    m
});

/// Recording condition of a data session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Sessions 1-4: good camera, quiet office
    Controlled,
    /// Sessions 5-8: cheap camera, office noise
    Degraded,
    /// Sessions 9-12: adverse acquisition environment
    Adverse,
}

impl Condition {
    /// Condition under which a given session was recorded
    pub fn from_session(session_id: i64) -> anyhow::Result<Condition> {
        match session_id {
            1..=4 => Ok(Condition::Controlled),
            5..=8 => Ok(Condition::Degraded),
            9..=12 => Ok(Condition::Adverse),
            _ => Err(anyhow!("Invalid session id: {}", session_id)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Controlled => write!(f, "controlled"),
            Condition::Degraded => write!(f, "degraded"),
            Condition::Adverse => write!(f, "adverse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocolFromStr_shouldParseCaseInsensitive() {
        assert_eq!("Mc".parse::<Protocol>().unwrap(), Protocol::Mc);
        assert_eq!("mc".parse::<Protocol>().unwrap(), Protocol::Mc);
        assert_eq!("P".parse::<Protocol>().unwrap(), Protocol::P);
        assert!("Q".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_protocolAll_shouldContainSevenProtocols() {
        assert_eq!(Protocol::all().len(), 7);
    }

    #[test]
    fn test_definition_matchedProtocols_shouldStayWithinOneCondition() {
        for protocol in [Protocol::Mc, Protocol::Md, Protocol::Ma] {
            let def = protocol.definition();
            let cond = Condition::from_session(def.enroll_sessions[0]).unwrap();
            for s in def.client_probe_sessions {
                assert_eq!(Condition::from_session(*s).unwrap(), cond);
            }
            for s in def.impostor_probe_sessions {
                assert_eq!(Condition::from_session(*s).unwrap(), cond);
            }
        }
    }

    #[test]
    fn test_definition_unmatchedProtocols_shouldEnrollControlled() {
        for protocol in [Protocol::Ud, Protocol::Ua] {
            let def = protocol.definition();
            assert_eq!(def.enroll_sessions, &[1]);
            let cond = Condition::from_session(def.client_probe_sessions[0]).unwrap();
            assert_ne!(cond, Condition::Controlled);
        }
    }

    #[test]
    fn test_definition_enrollAndClientProbes_shouldBeDisjoint() {
        for protocol in Protocol::all() {
            let def = protocol.definition();
            for s in def.enroll_sessions {
                assert!(
                    !def.client_probe_sessions.contains(s),
                    "protocol {} reuses enroll session {} as client probe",
                    protocol,
                    s
                );
            }
        }
    }

    #[test]
    fn test_conditionFromSession_shouldRejectOutOfRange() {
        assert!(Condition::from_session(0).is_err());
        assert!(Condition::from_session(13).is_err());
    }
}
