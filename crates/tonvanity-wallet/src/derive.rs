//! State-init construction and address derivation

use std::sync::Arc;

use crate::address::{Address, AddressFlags};
use crate::boc::to_boc_base64;
use crate::cell::{Cell, CellBuilder, CellError};
use crate::contract::WalletTemplate;

/// Workchain every derived wallet lives in
pub const WORKCHAIN: i8 = 0;

/// Build the `StateInit` cell: no split depth, not special, code, data, no library
pub fn state_init(code: Arc<Cell>, data: Arc<Cell>) -> Result<Cell, CellError> {
    let mut builder = CellBuilder::new();
    builder
        .store_bit(false)? // split_depth
        .store_bit(false)? // special
        .store_maybe_ref(Some(code))?
        .store_maybe_ref(Some(data))?
        .store_bit(false)?; // library
    Ok(builder.build())
}

/// An address together with the state-init it was computed from
#[derive(Debug, Clone)]
pub struct DerivedAddress {
    pub address: Address,
    /// Bounceable, URL-safe, mainnet form
    pub friendly: String,
    pub state_init: Arc<Cell>,
}

impl DerivedAddress {
    /// State-init as base64 bag-of-cells, ready for deployment
    pub fn state_init_boc(&self) -> String {
        to_boc_base64(&self.state_init)
    }
}

/// Derives wallet addresses for one template, reusing its code cell
#[derive(Debug, Clone)]
pub struct AddressDeriver {
    template: WalletTemplate,
    code: Arc<Cell>,
}

impl AddressDeriver {
    pub fn new(template: WalletTemplate) -> Result<Self, CellError> {
        let code = template.contract().code()?;
        Ok(Self { template, code })
    }

    pub fn template(&self) -> WalletTemplate {
        self.template
    }

    pub fn derive(&self, public_key: &[u8; 32]) -> Result<DerivedAddress, CellError> {
        let data = Arc::new(self.template.contract().data(public_key)?);
        let init = Arc::new(state_init(self.code.clone(), data)?);
        let address = Address::new(WORKCHAIN, *init.hash());
        Ok(DerivedAddress {
            friendly: address.to_user_friendly(AddressFlags::default()),
            address,
            state_init: init,
        })
    }
}

/// One-off derivation
pub fn derive_address(
    public_key: &[u8; 32],
    template: WalletTemplate,
) -> Result<DerivedAddress, CellError> {
    AddressDeriver::new(template)?.derive(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_init_shape() {
        let code = Arc::new(Cell::leaf(&[0xAA]).unwrap());
        let data = Arc::new(Cell::leaf(&[0xBB]).unwrap());
        let init = state_init(code, data).unwrap();
        assert_eq!(init.bit_len(), 5);
        assert_eq!(init.descriptors(), [2, 1]);
        assert_eq!(init.padded_data(), vec![0b0011_0100]);
        assert_eq!(init.depth(), 1);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let key = [0x42; 32];
        for template in WalletTemplate::all() {
            let a = derive_address(&key, template).unwrap();
            let b = derive_address(&key, template).unwrap();
            assert_eq!(a.friendly, b.friendly);
            assert_eq!(a.state_init_boc(), b.state_init_boc());
            assert!(a.friendly.starts_with("EQ"));
            assert_eq!(a.friendly.len(), 48);
            assert_eq!(a.friendly.parse::<Address>().unwrap(), a.address);
        }
    }

    #[test]
    fn test_known_addresses() {
        let key = [0x42; 32];
        assert_eq!(
            derive_address(&key, WalletTemplate::V4R2).unwrap().friendly,
            "EQBdK0y7N5Jbb76WlEiO9BobQ9TM_Ah7mzApZpzwq2DcgGQ6"
        );
        assert_eq!(
            derive_address(&key, WalletTemplate::Simple).unwrap().address.to_raw(),
            "0:35294de6b6cc3ba6e87ac3917a5c66a7bf079e62fe28c2705473036a77974bc3"
        );
    }

    #[test]
    fn test_templates_and_keys_differ() {
        let v4 = derive_address(&[1; 32], WalletTemplate::V4R2).unwrap();
        let simple = derive_address(&[1; 32], WalletTemplate::Simple).unwrap();
        let other = derive_address(&[2; 32], WalletTemplate::V4R2).unwrap();
        assert_ne!(v4.address, simple.address);
        assert_ne!(v4.address, other.address);
    }
}
