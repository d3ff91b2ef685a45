use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::error::{DiddocError, DiddocErrorKind, DiddocResult};
use crate::validation::validate_verkey;

pub const CONTEXT: &str = "https://w3id.org/did/v1";
pub const KEY_TYPE: &str = "Ed25519VerificationKey2018";
pub const KEY_AUTHENTICATION_TYPE: &str = "Ed25519SignatureAuthentication2018";
pub const SERVICE_TYPE: &str = "IndyAgent";

/// DID Document of one exchange party. Service entries may name keys either
/// as references into `publicKey` (`<did>#keys-1`) or as inlined base58
/// verkeys; both forms occur on the wire.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AriesDidDoc {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    #[serde(rename = "publicKey")]
    pub public_key: Vec<Ed25519PublicKey>,
    #[serde(default)]
    pub authentication: Vec<Authentication>,
    #[serde(default)]
    pub service: Vec<Service>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Ed25519PublicKey {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    #[serde(rename = "publicKeyBase58")]
    pub public_key_base_58: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    #[serde(rename = "routingKeys")]
    pub routing_keys: Vec<String>,
    #[serde(default)]
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl Default for Service {
    fn default() -> Service {
        Service {
            id: String::from("#service-1"),
            type_: String::from(SERVICE_TYPE),
            priority: 0,
            recipient_keys: Vec::new(),
            routing_keys: Vec::new(),
            service_endpoint: String::new(),
        }
    }
}

impl Default for AriesDidDoc {
    fn default() -> AriesDidDoc {
        AriesDidDoc {
            context: String::from(CONTEXT),
            id: String::new(),
            public_key: Vec::new(),
            authentication: Vec::new(),
            service: vec![Service::default()],
        }
    }
}

impl AriesDidDoc {
    pub fn new(did: String) -> AriesDidDoc {
        AriesDidDoc {
            id: did,
            ..Default::default()
        }
    }

    /// Registers a verification key: a `publicKey` entry addressed as
    /// `<did>#keys-<n>`, its authentication proof purpose, and a reference
    /// on the service entry.
    pub fn add_recipient_key(&mut self, verkey: String) {
        let reference = format!("{}#keys-{}", self.id, self.public_key.len() + 1);
        self.public_key.push(Ed25519PublicKey {
            id: reference.clone(),
            type_: String::from(KEY_TYPE),
            controller: self.id.clone(),
            public_key_base_58: verkey,
        });
        self.authentication.push(Authentication {
            type_: String::from(KEY_AUTHENTICATION_TYPE),
            public_key: reference.clone(),
        });
        if let Some(service) = self.service.first_mut() {
            service.recipient_keys.push(reference);
        }
    }

    /// Routing keys belong to mediators, not to this document's subject, so
    /// they are carried inline rather than through `publicKey`.
    pub fn add_routing_key(&mut self, verkey: String) {
        if let Some(service) = self.service.first_mut() {
            service.routing_keys.push(verkey);
        }
    }

    pub fn set_endpoint(&mut self, endpoint: String) {
        if let Some(service) = self.service.first_mut() {
            service.service_endpoint = endpoint;
        }
    }

    fn fragment(reference: &str) -> &str {
        reference.rsplit('#').next().unwrap_or(reference)
    }

    /// Resolves a service-entry key (reference or inlined verkey) against
    /// the `publicKey` section. Key ids are matched whole and by fragment,
    /// so both `<did>#keys-1` ids and bare numbered ids dereference.
    fn key_value(&self, entry: &str) -> Option<&str> {
        let fragment = AriesDidDoc::fragment(entry);
        self.public_key
            .iter()
            .find(|key| key.id == entry || AriesDidDoc::fragment(&key.id) == fragment || key.public_key_base_58 == entry)
            .map(|key| key.public_key_base_58.as_str())
    }

    fn service_keys(&self, entries: &[String]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| self.key_value(entry).unwrap_or(entry).to_string())
            .collect()
    }

    /// Raw base58 recipient verkeys of the first service entry.
    pub fn recipient_keys(&self) -> Vec<String> {
        match self.service.first() {
            Some(service) => self.service_keys(&service.recipient_keys),
            None => Vec::new(),
        }
    }

    pub fn routing_keys(&self) -> Vec<String> {
        match self.service.first() {
            Some(service) => self.service_keys(&service.routing_keys),
            None => Vec::new(),
        }
    }

    /// First service entry with every key dereferenced to its raw verkey;
    /// what an outbound dispatcher needs to reach the subject.
    pub fn resolved_service(&self) -> DiddocResult<Service> {
        let service = self.service.first().ok_or(DiddocError::from_msg(
            DiddocErrorKind::InvalidState,
            format!("DID Document {} carries no service entry", self.id),
        ))?;
        Ok(Service {
            recipient_keys: self.service_keys(&service.recipient_keys),
            routing_keys: self.service_keys(&service.routing_keys),
            ..service.clone()
        })
    }

    /// Checks the document is one this agent can work with: the fixed
    /// context, Ed25519 key material throughout, resolvable key references,
    /// and well-formed endpoint URLs.
    pub fn validate(&self) -> DiddocResult<()> {
        if self.context != CONTEXT {
            return Err(DiddocError::from_msg(
                DiddocErrorKind::InvalidJson,
                format!("Unexpected @context: {:?}", self.context),
            ));
        }

        for key in &self.public_key {
            if key.type_ != KEY_TYPE {
                return Err(DiddocError::from_msg(
                    DiddocErrorKind::UnsupportedPublicKeyType,
                    format!("Verification key {} has unsupported type {:?}", key.id, key.type_),
                ));
            }
            validate_verkey(&key.public_key_base_58)?;
        }

        for authentication in &self.authentication {
            if authentication.type_ != KEY_AUTHENTICATION_TYPE && authentication.type_ != KEY_TYPE {
                return Err(DiddocError::from_msg(
                    DiddocErrorKind::UnsupportedPublicKeyType,
                    format!("Authentication has unsupported type {:?}", authentication.type_),
                ));
            }
            if self.key_value(&authentication.public_key).is_none() {
                return Err(DiddocError::from_msg(
                    DiddocErrorKind::InvalidJson,
                    format!("Authentication references undeclared key {}", authentication.public_key),
                ));
            }
        }

        for service in &self.service {
            Url::parse(&service.service_endpoint).map_err(|err| {
                DiddocError::from_msg(
                    DiddocErrorKind::InvalidUrl,
                    format!("Service endpoint {:?} is not a URL: {}", service.service_endpoint, err),
                )
            })?;
            for entry in service.recipient_keys.iter().chain(service.routing_keys.iter()) {
                if self.key_value(entry).is_some() {
                    continue;
                }
                if entry.contains('#') {
                    return Err(DiddocError::from_msg(
                        DiddocErrorKind::InvalidJson,
                        format!("Service references undeclared key {}", entry),
                    ));
                }
                validate_verkey(entry)?;
            }
        }

        Ok(())
    }
}

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils {
    use super::*;

    pub fn _verkey(tag: u8) -> String {
        bs58::encode([tag; 32]).into_string()
    }

    pub fn _did() -> String {
        String::from("did:example:alice")
    }

    pub fn _endpoint() -> String {
        String::from("https://agent.example.org/didcomm")
    }

    pub fn _recipient_keys() -> Vec<String> {
        vec![_verkey(1)]
    }

    pub fn _routing_keys() -> Vec<String> {
        vec![_verkey(2), _verkey(3)]
    }

    pub fn _did_doc() -> AriesDidDoc {
        let mut doc = AriesDidDoc::new(_did());
        doc.set_endpoint(_endpoint());
        doc.add_recipient_key(_verkey(1));
        doc.add_routing_key(_verkey(2));
        doc.add_routing_key(_verkey(3));
        doc
    }

    /// Document in the wire variant that inlines raw verkeys on the service
    /// entry instead of referencing `publicKey`.
    pub fn _did_doc_inline() -> AriesDidDoc {
        AriesDidDoc {
            id: _did(),
            public_key: Vec::new(),
            authentication: Vec::new(),
            service: vec![Service {
                recipient_keys: vec![_verkey(1)],
                routing_keys: _routing_keys(),
                service_endpoint: _endpoint(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    pub fn _did_doc_secp256k1() -> AriesDidDoc {
        let mut doc = _did_doc();
        for key in doc.public_key.iter_mut() {
            key.type_ = String::from("Secp256k1VerificationKey2018");
        }
        doc
    }
}
