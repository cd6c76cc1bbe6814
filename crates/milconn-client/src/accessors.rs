//! Typed reads and writes.

use std::time::Duration;

use milconn_transport::Transport;
use milconn_value::{encode_f32, encode_f64, Address, Value, VarKind, WireValue};
use tracing::debug;

use crate::client::Client;
use crate::error::{ClientError, Result};

macro_rules! typed_get {
    ($get:ident, $get_with_timeout:ident, $kind:ident, $ty:ty) => {
        #[doc = concat!("Read a ", stringify!($kind), " value with the configured get timeout.")]
        pub fn $get(&self, address: Address) -> Result<$ty> {
            self.$get_with_timeout(address, self.config.get_timeout)
        }

        #[doc = concat!("Read a ", stringify!($kind), " value, waiting at most `timeout`.")]
        pub fn $get_with_timeout(&self, address: Address, timeout: Duration) -> Result<$ty> {
            match self.get(VarKind::$kind, address, timeout)? {
                WireValue::$kind(v) => Ok(v),
                other => Err(unexpected_kind(VarKind::$kind, other)),
            }
        }
    };
}

impl<T: Transport> Client<T> {
    /// Write `value` after fitting it to `kind`.
    ///
    /// Range and type are checked before any native call.
    pub fn set(&self, kind: VarKind, address: Address, value: impl Into<Value>) -> Result<()> {
        let wire = value.into().encode(kind)?;
        self.write(address, wire)
    }

    /// Write an already-encoded value.
    pub fn write(&self, address: Address, value: WireValue) -> Result<()> {
        let kind = value.kind();
        let mut guard = self.shared.session.lock();
        let session = &mut *guard;
        let handle = session.live_handle()?;
        let transport = &self.shared.transport;

        if transport.set_value(handle, address, value) {
            debug!(%kind, address, %value, "value sent");
            return Ok(());
        }
        if !transport.is_connected(handle) {
            session.mark_lost("connection lost");
        }
        Err(ClientError::Send { kind, address })
    }

    pub fn set_bool(&self, address: Address, value: bool) -> Result<()> {
        self.write(address, WireValue::Bool(value))
    }

    pub fn set_byte(&self, address: Address, value: u8) -> Result<()> {
        self.write(address, WireValue::Byte(value))
    }

    pub fn set_word(&self, address: Address, value: u16) -> Result<()> {
        self.write(address, WireValue::Word(value))
    }

    pub fn set_dword(&self, address: Address, value: u32) -> Result<()> {
        self.write(address, WireValue::DWord(value))
    }

    pub fn set_lword(&self, address: Address, value: u64) -> Result<()> {
        self.write(address, WireValue::LWord(value))
    }

    /// Write the bit pattern of `value` to a DWORD slot.
    pub fn set_dword_f32(&self, address: Address, value: f32) -> Result<()> {
        self.write(address, WireValue::DWord(encode_f32(value)))
    }

    /// Write the bit pattern of `value` to an LWORD slot.
    pub fn set_lword_f64(&self, address: Address, value: f64) -> Result<()> {
        self.write(address, WireValue::LWord(encode_f64(value)))
    }

    /// Read `(kind, address)`, waiting at most `timeout`.
    pub fn get(&self, kind: VarKind, address: Address, timeout: Duration) -> Result<WireValue> {
        let value = self.request_and_wait(kind, address, timeout)?;
        debug!(%kind, address, %value, "value received");
        Ok(value)
    }

    typed_get!(get_bool, get_bool_with_timeout, Bool, bool);
    typed_get!(get_byte, get_byte_with_timeout, Byte, u8);
    typed_get!(get_word, get_word_with_timeout, Word, u16);
    typed_get!(get_dword, get_dword_with_timeout, DWord, u32);
    typed_get!(get_lword, get_lword_with_timeout, LWord, u64);
}

fn unexpected_kind(expected: VarKind, got: WireValue) -> ClientError {
    ClientError::Api(format!(
        "transport returned a {} value for a {expected} read",
        got.kind()
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use milconn_transport::{SimConfig, SimTransport};
    use milconn_value::decode_f32;

    use super::*;
    use crate::error::ErrorClass;
    use crate::test_support::{connected_sim_client, fast_config};

    #[test]
    fn set_while_disconnected_makes_no_native_call() {
        let sim = Arc::new(SimTransport::new());
        let client = Client::with_config(sim.clone(), fast_config());

        let err = client.set_word(10, 5).unwrap_err();

        assert_eq!(err.class(), ErrorClass::Connection);
        assert_eq!(sim.stats(), Default::default());
    }

    #[test]
    fn out_of_range_is_rejected_before_send() {
        let (sim, client) = connected_sim_client(SimConfig::default());
        let err = client.set(VarKind::Byte, 1, 256u16).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
        let err = client.set(VarKind::Word, 1, -1i32).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
        let err = client.set(VarKind::Bool, 1, 1u8).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(sim.stats().sets, 0);
    }

    #[test]
    fn typed_writes_land_in_controller_memory() {
        let (sim, client) = connected_sim_client(SimConfig::default());
        client.set_bool(100, true).unwrap();
        client.set_byte(110, 255).unwrap();
        client.set_word(120, 65_535).unwrap();
        client.set_dword(130, u32::MAX).unwrap();
        client.set_lword(140, u64::MAX).unwrap();

        assert_eq!(sim.memory(VarKind::Bool, 100), Some(WireValue::Bool(true)));
        assert_eq!(sim.memory(VarKind::Byte, 110), Some(WireValue::Byte(255)));
        assert_eq!(sim.memory(VarKind::Word, 120), Some(WireValue::Word(65_535)));
        assert_eq!(
            sim.memory(VarKind::DWord, 130),
            Some(WireValue::DWord(u32::MAX))
        );
        assert_eq!(
            sim.memory(VarKind::LWord, 140),
            Some(WireValue::LWord(u64::MAX))
        );
    }

    #[test]
    fn float_write_reads_back_as_bit_pattern() {
        let (_sim, client) = connected_sim_client(SimConfig::default());
        client.set_dword_f32(150, 123.456).unwrap();

        let raw = client.get_dword(150).unwrap();

        assert_eq!(raw, 0x42F6_E979);
        assert_eq!(decode_f32(raw), 123.456);
    }

    #[test]
    fn lword_f64_write_keeps_bits() {
        let (sim, client) = connected_sim_client(SimConfig::default());
        client.set(VarKind::LWord, 160, -2.5f64).unwrap();
        assert_eq!(
            sim.memory(VarKind::LWord, 160),
            Some(WireValue::LWord((-2.5f64).to_bits()))
        );
        client.set_lword_f64(161, 0.1).unwrap();
        assert_eq!(client.get_lword(161).unwrap(), 0.1f64.to_bits());
    }

    #[test]
    fn rejected_send_is_a_send_error() {
        let (sim, client) = connected_sim_client(SimConfig {
            reject_sets: true,
            ..SimConfig::default()
        });
        let err = client.set_byte(1, 1).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Send {
                kind: VarKind::Byte,
                address: 1
            }
        ));
        assert!(client.is_connected());
        assert_eq!(sim.stats().sets, 1);
    }

    #[test]
    fn typed_getters_use_configured_timeout() {
        let (sim, client) = connected_sim_client(SimConfig::default());
        sim.preset(120, WireValue::Word(0xBEEF));
        sim.preset(100, WireValue::Bool(true));
        sim.preset(110, WireValue::Byte(7));
        assert_eq!(client.get_word(120).unwrap(), 0xBEEF);
        assert!(client.get_bool(100).unwrap());
        assert_eq!(client.get_byte(110).unwrap(), 7);
        assert_eq!(
            client
                .get_byte_with_timeout(111, Duration::from_millis(500))
                .unwrap(),
            0
        );
    }
}
