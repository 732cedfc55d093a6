// wbemping Infrastructure - WBEM Adapters
// Implements: RemoteConnector (CIM-XML over HTTP), system ping pre-check

pub mod cim_xml;
pub mod connector;
pub mod ping;

pub use connector::{CimExchange, CimXmlConnector};
pub use ping::SystemPinger;
