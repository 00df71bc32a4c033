//! Extended query protocol backend messages.

use zerocopy::FromBytes;

use crate::error::Kind;
use crate::protocol::codec::read_u32;
use crate::protocol::types::{Oid, U16Be};

/// ParameterDescription message - parameter type OIDs of a prepared statement.
#[derive(Debug, Clone)]
pub struct ParameterDescription {
    param_oids: Vec<Oid>,
}

impl ParameterDescription {
    /// Parse a ParameterDescription message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self, Kind> {
        if payload.len() < 2 {
            return Err(Kind::ProtocolValueError);
        }
        let head = U16Be::ref_from_bytes(&payload[..2]).map_err(|_| Kind::ProtocolValueError)?;

        let num_params = head.get() as usize;
        let mut param_oids = Vec::with_capacity(num_params);
        let mut data = &payload[2..];

        for _ in 0..num_params {
            let (oid, rest) = read_u32(data)?;
            param_oids.push(oid);
            data = rest;
        }

        Ok(Self { param_oids })
    }

    /// Get the number of parameters.
    pub fn len(&self) -> usize {
        self.param_oids.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.param_oids.is_empty()
    }

    /// Get parameter type OIDs.
    pub fn oids(&self) -> &[Oid] {
        &self.param_oids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_description() {
        let mut payload = 2_u16.to_be_bytes().to_vec();
        payload.extend_from_slice(&23_u32.to_be_bytes());
        payload.extend_from_slice(&25_u32.to_be_bytes());

        let desc = ParameterDescription::parse(&payload).unwrap();
        assert_eq!(desc.oids(), &[23, 25]);
    }
}
