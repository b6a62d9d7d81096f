//! Decoding of on-chain stream accounts into [`StreamRecord`]s.
//!
//! The account starts with a fixed 170-byte header read with `borsh`,
//! followed by the UTF-8 stream name and an optional pause tail:
//!
//! ```text
//! 0    discriminator      [u8; 8]
//! 8    sender             [u8; 32]
//! 40   recipient          [u8; 32]
//! 72   mint               [u8; 32]
//! 104  deposited_amount   u64
//! 112  withdrawn_amount   u64
//! 120  start_time         i64
//! 128  end_time           i64
//! 136  cliff_time         i64   (0 = no cliff)
//! 144  flags              u8
//! 145  withdrawal_freq    u64
//! 153  last_withdrawn_at  i64
//! 161  created_at         i64
//! 169  name_len           u8
//! 170  name               [u8; name_len]
//! +0   paused_at          i64   (optional, 0 = not paused)
//! +8   total_paused_time  i64   (optional)
//! ```

use borsh::BorshDeserialize;
use stream_accounting::{StreamParameters, StreamPermissions, StreamRecord};

use crate::errors::{IndexerError, Result};

pub const HEADER_LEN: usize = 170;

pub const FLAG_CANCELABLE_BY_SENDER: u8 = 1;
pub const FLAG_CANCELABLE_BY_RECIPIENT: u8 = 1 << 1;
pub const FLAG_TRANSFERABLE_BY_SENDER: u8 = 1 << 2;
pub const FLAG_TRANSFERABLE_BY_RECIPIENT: u8 = 1 << 3;
pub const FLAG_AUTOMATIC_WITHDRAWAL: u8 = 1 << 4;
pub const FLAG_CANCELED: u8 = 1 << 5;
pub const FLAG_PAUSED: u8 = 1 << 6;

#[derive(Debug, BorshDeserialize)]
struct StreamAccountHeader {
    _discriminator: [u8; 8],
    sender: [u8; 32],
    recipient: [u8; 32],
    mint: [u8; 32],
    deposited_amount: u64,
    withdrawn_amount: u64,
    start_time: i64,
    end_time: i64,
    cliff_time: i64,
    flags: u8,
    withdrawal_frequency: u64,
    last_withdrawn_at: i64,
    created_at: i64,
    name_len: u8,
}

/// Decode and validate the raw bytes of the stream account at `address`.
pub fn decode_stream_account(address: &str, data: &[u8]) -> Result<StreamRecord> {
    if data.len() < HEADER_LEN {
        return Err(IndexerError::AccountDecode(format!(
            "{address}: {} bytes is shorter than the {HEADER_LEN}-byte header",
            data.len()
        )));
    }

    let mut cursor = data;
    let header = StreamAccountHeader::deserialize(&mut cursor).map_err(|e| {
        IndexerError::AccountDecode(format!(
            "{address} (discriminator {}): {e}",
            hex::encode(&data[..8])
        ))
    })?;

    let name_end = HEADER_LEN + header.name_len as usize;
    let name = data
        .get(HEADER_LEN..name_end)
        .map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .to_string()
        })
        .ok_or_else(|| {
            IndexerError::AccountDecode(format!(
                "{address}: name of {} bytes runs past the account end",
                header.name_len
            ))
        })?;

    let paused_at = read_i64(data, name_end).filter(|&t| t != 0);
    let total_paused_time = read_i64(data, name_end + 8).unwrap_or(0);
    let flags = header.flags;

    let params = StreamParameters {
        total_amount: header.deposited_amount,
        start_time: header.start_time,
        end_time: header.end_time,
        cliff_time: (header.cliff_time != 0).then_some(header.cliff_time),
        withdrawn_amount: header.withdrawn_amount,
        paused: flags & FLAG_PAUSED != 0,
        paused_at,
        total_paused_time,
        canceled: flags & FLAG_CANCELED != 0,
        automatic_withdrawal: flags & FLAG_AUTOMATIC_WITHDRAWAL != 0,
        withdrawal_frequency: header.withdrawal_frequency,
        last_withdrawal_time: if header.last_withdrawn_at > 0 {
            header.last_withdrawn_at
        } else {
            header.start_time
        },
    };
    params.validate()?;

    Ok(StreamRecord {
        id: address.to_string(),
        sender: bs58::encode(header.sender).into_string(),
        recipient: bs58::encode(header.recipient).into_string(),
        mint: bs58::encode(header.mint).into_string(),
        name,
        created_at: header.created_at,
        permissions: StreamPermissions {
            cancelable_by_sender: flags & FLAG_CANCELABLE_BY_SENDER != 0,
            cancelable_by_recipient: flags & FLAG_CANCELABLE_BY_RECIPIENT != 0,
            transferable_by_sender: flags & FLAG_TRANSFERABLE_BY_SENDER != 0,
            transferable_by_recipient: flags & FLAG_TRANSFERABLE_BY_RECIPIENT != 0,
        },
        params,
    })
}

fn read_i64(data: &[u8], offset: usize) -> Option<i64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(i64::from_le_bytes(bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SENDER: [u8; 32] = [1; 32];
    pub(crate) const RECIPIENT: [u8; 32] = [2; 32];
    pub(crate) const MINT: [u8; 32] = [3; 32];

    /// Hand-built account bytes, field by field.
    pub(crate) struct AccountBytes {
        pub deposited: u64,
        pub withdrawn: u64,
        pub start: i64,
        pub end: i64,
        pub cliff: i64,
        pub flags: u8,
        pub frequency: u64,
        pub last_withdrawn_at: i64,
        pub created_at: i64,
        pub name: &'static str,
        pub tail: Option<(i64, i64)>,
    }

    impl Default for AccountBytes {
        fn default() -> Self {
            Self {
                deposited: 1_000,
                withdrawn: 0,
                start: 1_000,
                end: 2_000,
                cliff: 0,
                flags: 0,
                frequency: 0,
                last_withdrawn_at: 0,
                created_at: 900,
                name: "payroll",
                tail: None,
            }
        }
    }

    impl AccountBytes {
        pub(crate) fn build(&self) -> Vec<u8> {
            let mut data = vec![0xAA; 8];
            data.extend_from_slice(&SENDER);
            data.extend_from_slice(&RECIPIENT);
            data.extend_from_slice(&MINT);
            data.extend_from_slice(&self.deposited.to_le_bytes());
            data.extend_from_slice(&self.withdrawn.to_le_bytes());
            data.extend_from_slice(&self.start.to_le_bytes());
            data.extend_from_slice(&self.end.to_le_bytes());
            data.extend_from_slice(&self.cliff.to_le_bytes());
            data.push(self.flags);
            data.extend_from_slice(&self.frequency.to_le_bytes());
            data.extend_from_slice(&self.last_withdrawn_at.to_le_bytes());
            data.extend_from_slice(&self.created_at.to_le_bytes());
            data.push(self.name.len() as u8);
            data.extend_from_slice(self.name.as_bytes());
            if let Some((paused_at, total_paused)) = self.tail {
                data.extend_from_slice(&paused_at.to_le_bytes());
                data.extend_from_slice(&total_paused.to_le_bytes());
            }
            data
        }
    }

    #[test]
    fn header_offsets_line_up() {
        let data = AccountBytes::default().build();
        assert_eq!(data[HEADER_LEN - 1] as usize, "payroll".len());
        assert_eq!(&data[104..112], &1_000u64.to_le_bytes());
        assert_eq!(data.len(), HEADER_LEN + 7);
    }

    #[test]
    fn decodes_plain_stream() {
        let data = AccountBytes::default().build();
        let record = decode_stream_account("stream-1", &data).unwrap();

        assert_eq!(record.id, "stream-1");
        assert_eq!(record.sender, bs58::encode(SENDER).into_string());
        assert_eq!(record.recipient, bs58::encode(RECIPIENT).into_string());
        assert_eq!(record.mint, bs58::encode(MINT).into_string());
        assert_eq!(record.name, "payroll");
        assert_eq!(record.created_at, 900);
        assert_eq!(record.permissions, StreamPermissions::default());

        let params = &record.params;
        assert_eq!(params.total_amount, 1_000);
        assert_eq!(params.start_time, 1_000);
        assert_eq!(params.end_time, 2_000);
        assert_eq!(params.cliff_time, None);
        assert_eq!(params.last_withdrawal_time, 1_000);
        assert!(!params.paused);
        assert_eq!(params.paused_at, None);
        assert_eq!(params.total_paused_time, 0);
    }

    #[test]
    fn decodes_flags_cliff_and_pause_tail() {
        let data = AccountBytes {
            cliff: 1_200,
            flags: FLAG_CANCELABLE_BY_SENDER
                | FLAG_TRANSFERABLE_BY_RECIPIENT
                | FLAG_AUTOMATIC_WITHDRAWAL
                | FLAG_PAUSED,
            frequency: 3_600,
            withdrawn: 250,
            last_withdrawn_at: 1_500,
            tail: Some((1_600, 40)),
            ..Default::default()
        }
        .build();
        let record = decode_stream_account("stream-2", &data).unwrap();

        assert!(record.permissions.cancelable_by_sender);
        assert!(!record.permissions.cancelable_by_recipient);
        assert!(!record.permissions.transferable_by_sender);
        assert!(record.permissions.transferable_by_recipient);

        let params = &record.params;
        assert_eq!(params.cliff_time, Some(1_200));
        assert_eq!(params.withdrawn_amount, 250);
        assert!(params.automatic_withdrawal);
        assert_eq!(params.withdrawal_frequency, 3_600);
        assert_eq!(params.last_withdrawal_time, 1_500);
        assert!(params.paused);
        assert!(!params.canceled);
        assert_eq!(params.paused_at, Some(1_600));
        assert_eq!(params.total_paused_time, 40);
    }

    #[test]
    fn zero_paused_at_means_none() {
        let data = AccountBytes {
            flags: FLAG_CANCELED,
            tail: Some((0, 25)),
            ..Default::default()
        }
        .build();
        let record = decode_stream_account("stream-3", &data).unwrap();

        assert!(record.params.canceled);
        assert_eq!(record.params.paused_at, None);
        assert_eq!(record.params.total_paused_time, 25);
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let mut data = AccountBytes {
            name: "",
            ..Default::default()
        }
        .build();
        data.resize(1_000, 0);

        let record = decode_stream_account("stream-4", &data).unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.params.paused_at, None);
        assert_eq!(record.params.total_paused_time, 0);
    }

    #[test]
    fn rejects_short_account() {
        let data = AccountBytes::default().build();
        let err = decode_stream_account("short", &data[..100]).unwrap_err();
        assert!(matches!(err, IndexerError::AccountDecode(_)));
    }

    #[test]
    fn rejects_truncated_name() {
        let mut data = AccountBytes::default().build();
        data.truncate(HEADER_LEN + 3);
        let err = decode_stream_account("truncated", &data).unwrap_err();
        assert!(err.to_string().contains("name of 7 bytes"));
    }

    #[test]
    fn rejects_invalid_parameters() {
        let data = AccountBytes {
            start: 2_000,
            end: 1_000,
            ..Default::default()
        }
        .build();
        let err = decode_stream_account("inverted", &data).unwrap_err();
        assert!(matches!(err, IndexerError::Stream(_)));
    }
}
