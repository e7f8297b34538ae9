//! Consensus constants for absolute-timelock scripts

/// Maximum money supply: 21,000,000 coins in smallest units
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Maximum serialized transaction size accepted for spending
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Maximum script length
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum size of a single stack element
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum stack size during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of non-push operations in a script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Lock time threshold: values below are block heights, at or above are timestamps
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number for a final input
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Highest non-final sequence number; enables lock time without signalling replacement
pub const SEQUENCE_LOCKTIME_ENABLED: u32 = 0xfffffffe;

/// Byte width accepted for the lock-time operand (covers the full u32 range)
pub const MAX_LOCKTIME_NUM_LEN: usize = 5;

/// Byte width of ordinary arithmetic operands
pub const MAX_SCRIPT_NUM_LEN: usize = 4;

/// Compressed secp256k1 public key length
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Length of a HASH160 digest
pub const HASH160_LEN: usize = 20;

/// Blocks per day at the target spacing of 10 minutes
pub const BLOCKS_PER_DAY: u64 = 144;

/// Default dust threshold in smallest units
pub const DEFAULT_DUST_THRESHOLD: i64 = 546;

// Opcodes used by the lock, funding and unlocking scripts
pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_NOP: u8 = 0x61;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
