//! NIED seismic networks available from the Hi-net data service.

use std::{fmt, str::FromStr};

use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::errors::SeisDataErr;

/// New type wrapper for a raw network code such as `0101` or `0103A`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkCode {
    code: String,
}

impl NetworkCode {
    /// Create a new one. Codes are at least four characters, the first four being digits.
    pub fn new(code: &str) -> Result<Self, SeisDataErr> {
        let code = code.trim();
        let valid = code.len() >= 4
            && code.is_ascii()
            && code[..4].chars().all(|c| c.is_ascii_digit());

        if valid {
            Ok(NetworkCode {
                code: code.to_uppercase(),
            })
        } else {
            Err(SeisDataErr::InvalidNetworkCode(code.to_owned()))
        }
    }

    /// Parse a comma separated list of codes or names, e.g. `0101,0103` or `hinet,fnet`.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, SeisDataErr> {
        list.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::parse::<NetworkCode>)
            .collect()
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// The organization half of the code, `org1` in a data request.
    pub fn org(&self) -> &str {
        &self.code[..2]
    }

    /// The network half of the code, `org2` in a data request.
    pub fn net(&self) -> &str {
        &self.code[2..]
    }

    /// The known network for this code, if there is one.
    pub fn network(&self) -> Option<Network> {
        Network::iter().find(|net| net.code() == self.code)
    }

    /// Maximum number of minutes allowed in a single request for this network.
    pub fn max_span_minutes(&self) -> u32 {
        let channels = self
            .network()
            .map(Network::channel_count)
            .unwrap_or(Network::DEFAULT_CHANNELS);

        max_span_minutes(channels)
    }
}

impl FromStr for NetworkCode {
    type Err = SeisDataErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Network::from_str(&s.trim().to_lowercase()) {
            Ok(net) => Ok(net.into()),
            Err(_) => NetworkCode::new(s),
        }
    }
}

impl fmt::Display for NetworkCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl From<Network> for NetworkCode {
    fn from(net: Network) -> Self {
        NetworkCode {
            code: net.code().to_owned(),
        }
    }
}

/// Networks with known channel counts.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, AsRefStr, EnumIter, Hash)]
pub enum Network {
    /// NIED Hi-net, high sensitivity short period network.
    #[strum(to_string = "hinet", serialize = "0101")]
    Hinet,
    /// NIED F-net broadband velocity.
    #[strum(to_string = "fnet", serialize = "0103")]
    Fnet,
    /// NIED F-net broadband strong motion.
    #[strum(to_string = "fnet-sm", serialize = "0103a")]
    FnetStrongMotion,
    /// NIED V-net, volcano observation network.
    #[strum(to_string = "vnet", serialize = "0105")]
    Vnet,
    /// NIED S-net, seafloor acceleration.
    #[strum(to_string = "snet", serialize = "0120")]
    Snet,
    /// NIED S-net, seafloor velocity.
    #[strum(to_string = "snet-vel", serialize = "0120a")]
    SnetVelocity,
    /// NIED DONET1.
    #[strum(to_string = "donet1", serialize = "0120b")]
    Donet1,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

impl Network {
    /// Channel count assumed for networks not in the list.
    pub const DEFAULT_CHANNELS: u32 = 1000;

    /// The numeric network code.
    pub fn code(self) -> &'static str {
        use Network::*;

        match self {
            Hinet => "0101",
            Fnet => "0103",
            FnetStrongMotion => "0103A",
            Vnet => "0105",
            Snet => "0120",
            SnetVelocity => "0120A",
            Donet1 => "0120B",
        }
    }

    #[allow(missing_docs)]
    pub fn description(self) -> &'static str {
        use Network::*;

        match self {
            Hinet => "NIED Hi-net",
            Fnet => "NIED F-net (broadband)",
            FnetStrongMotion => "NIED F-net (strong motion)",
            Vnet => "NIED V-net",
            Snet => "NIED S-net (acceleration)",
            SnetVelocity => "NIED S-net (velocity)",
            Donet1 => "NIED DONET1",
        }
    }

    /// Approximate number of channels, used to size requests.
    pub fn channel_count(self) -> u32 {
        use Network::*;

        match self {
            Hinet => 2336,
            Fnet => 759,
            FnetStrongMotion => 759,
            Vnet => 1020,
            Snet => 1350,
            SnetVelocity => 1350,
            Donet1 => 616,
        }
    }
}

/// The service limits a request to `channels * minutes` of this many.
pub const MAX_SAMPLE_SIZE: u32 = 12_000;
/// The service limits a request to this many minutes.
pub const MAX_SPAN_MINUTES: u32 = 60;

/// Maximum number of minutes in a single request for a network with `channels` channels.
pub fn max_span_minutes(channels: u32) -> u32 {
    let by_size = MAX_SAMPLE_SIZE / channels.max(1);
    by_size.max(1).min(MAX_SPAN_MINUTES)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_parse_network_codes() {
        let codes = NetworkCode::parse_list("0101, 0103,0103a").unwrap();

        assert_eq!(codes.len(), 3);
        assert_eq!(codes[0].network(), Some(Network::Hinet));
        assert_eq!(codes[2].as_str(), "0103A");
        assert_eq!(codes[2].org(), "01");
        assert_eq!(codes[2].net(), "03A");

        assert!(NetworkCode::parse_list("0101,abc").is_err());
        assert!(NetworkCode::new("010").is_err());
    }

    #[test]
    fn test_network_from_name() {
        assert_eq!(
            NetworkCode::from_str("Hinet").unwrap(),
            NetworkCode::new("0101").unwrap()
        );
        assert_eq!(
            NetworkCode::from_str("fnet").unwrap(),
            NetworkCode::new("0103").unwrap()
        );
        assert_eq!(
            NetworkCode::from_str("0701").unwrap().network(),
            None,
            "unknown codes are still accepted"
        );
    }

    #[test]
    fn test_parse_list_of_names() {
        let codes = NetworkCode::parse_list("hinet, fnet,0105,snet-vel").unwrap();

        assert_eq!(
            codes,
            vec![
                NetworkCode::new("0101").unwrap(),
                NetworkCode::new("0103").unwrap(),
                NetworkCode::new("0105").unwrap(),
                NetworkCode::new("0120A").unwrap(),
            ]
        );

        assert!(NetworkCode::parse_list("hinet,nowhere").is_err());
    }

    #[test]
    fn test_codes_round_trip() {
        for net in Network::iter() {
            let code = NetworkCode::from(net);
            assert_eq!(code.network(), Some(net));
            assert_eq!(Network::from_str(&code.as_str().to_lowercase()).unwrap(), net);
        }
    }

    #[test]
    fn test_max_span() {
        assert_eq!(max_span_minutes(2336), 5);
        assert_eq!(max_span_minutes(759), 15);
        assert_eq!(max_span_minutes(10), 60);
        assert_eq!(max_span_minutes(50_000), 1);
        assert_eq!(NetworkCode::new("0101").unwrap().max_span_minutes(), 5);
    }
}
