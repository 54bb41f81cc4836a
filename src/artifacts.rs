use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};

/// Save a serializable object to a JSON file.
pub fn save_to_file<T: Serialize>(data: &T, path: &str) -> Result<()> {
    let file = File::create(path).map_err(|e| anyhow!("Failed to create {}: {}", path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, data)
        .map_err(|e| anyhow!("Failed to write {}: {}", path, e))?;
    Ok(())
}

/// Load a deserializable object from a JSON file.
pub fn load_from_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let file = File::open(path).map_err(|e| anyhow!("Failed to open {}: {}", path, e))?;
    let reader = BufReader::new(file);
    let data = serde_json::from_reader(reader)
        .map_err(|e| anyhow!("Failed to parse {}: {}", path, e))?;
    Ok(data)
}

/// The part of a contract build artifact this client reads: deployed
/// addresses keyed by network id. Everything else (ABI, bytecode) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractArtifact {
    #[serde(rename = "contractName", default)]
    pub contract_name: Option<String>,
    #[serde(default)]
    pub networks: HashMap<String, ArtifactNetwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactNetwork {
    pub address: Address,
}

impl ContractArtifact {
    pub fn address_for(&self, network_id: &str) -> Option<Address> {
        self.networks.get(network_id).map(|n| n.address)
    }
}

/// Use `explicit` if set, otherwise the address the artifact at `path`
/// records for `network_id`.
pub fn resolve_address(explicit: Option<Address>, path: &str, network_id: &str) -> Result<Address> {
    if let Some(address) = explicit {
        return Ok(address);
    }
    let artifact: ContractArtifact = load_from_file(path)?;
    artifact.address_for(network_id).ok_or_else(|| {
        anyhow!(
            "{} is not deployed to the detected network {}",
            artifact.contract_name.as_deref().unwrap_or(path),
            network_id
        )
    })
}
