//! Script execution for timelocked spends
//!
//! Stack machine covering the opcodes that appear in lock, funding and
//! key-hash scripts, with signature checks bound to the spending transaction
//! and `OP_CHECKLOCKTIMEVERIFY` enforced against its lock time.

use tracing::debug;

use crate::constants::*;
use crate::error::{Result, VaultError};
use crate::script::{extract_script_hash, hash160, push_data, read_instruction, small_int_value, Instruction};
use crate::script_num;
use crate::sighash;
use crate::types::*;

/// Transaction and input a script is being executed for.
#[derive(Debug, Clone, Copy)]
pub struct SpendContext<'a> {
    pub tx: &'a Transaction,
    pub input_index: usize,
}

impl<'a> SpendContext<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize) -> Result<Self> {
        if input_index >= tx.inputs.len() {
            return Err(VaultError::InvalidParameter(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                tx.inputs.len()
            )));
        }
        Ok(Self { tx, input_index })
    }

    fn input(&self) -> &TransactionInput {
        &self.tx.inputs[self.input_index]
    }
}

/// Truth value of a stack element: any non-zero byte, except negative zero.
pub fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            return !(i == data.len() - 1 && byte == 0x80);
        }
    }
    false
}

fn bool_element(value: bool) -> ByteString {
    if value {
        vec![1]
    } else {
        vec![]
    }
}

/// ExecuteScript: 𝒮𝒞 × 𝒮𝒯 × 𝒞 → {true, false}
///
/// Runs `script` against `stack`. Returns false when execution fails; the
/// final stack is left for the caller to judge. Exceeding the operation or
/// stack limits is an error.
pub fn execute_script(script: &[u8], stack: &mut Vec<ByteString>, ctx: &SpendContext) -> Result<bool> {
    if script.len() > MAX_SCRIPT_SIZE {
        debug!(len = script.len(), "script exceeds size limit");
        return Ok(false);
    }

    let mut op_count = 0;
    let mut pos = 0;
    let mut code_start = 0;

    while pos < script.len() {
        let (instruction, next) = match read_instruction(script, pos) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(pos, error = %e, "malformed script");
                return Ok(false);
            }
        };

        match instruction {
            Instruction::Push { data, .. } => {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    debug!(len = data.len(), "push exceeds element size limit");
                    return Ok(false);
                }
                stack.push(data);
            }
            Instruction::Op(opcode) => {
                if opcode > OP_16 {
                    op_count += 1;
                    if op_count > MAX_SCRIPT_OPS {
                        return Err(VaultError::ScriptExecution("Operation limit exceeded".to_string()));
                    }
                }
                if opcode == OP_CODESEPARATOR {
                    code_start = next;
                } else if !execute_opcode(opcode, stack, &script[code_start..], ctx)? {
                    debug!(opcode, pos, "opcode failed");
                    return Ok(false);
                }
            }
        }

        if stack.len() > MAX_STACK_SIZE {
            return Err(VaultError::ScriptExecution("Stack overflow".to_string()));
        }
        pos = next;
    }

    Ok(true)
}

/// EvalScript: 𝒮𝒞 × 𝒮𝒯 × 𝒞 → {true, false}
///
/// Execute, then require exactly one true value on the stack.
pub fn eval_script(script: &[u8], stack: &mut Vec<ByteString>, ctx: &SpendContext) -> Result<bool> {
    if !execute_script(script, stack, ctx)? {
        return Ok(false);
    }
    Ok(stack.len() == 1 && cast_to_bool(&stack[0]))
}

/// VerifySpend: 𝒯𝒳 × ℕ × 𝒮𝒞 → {true, false}
///
/// For input `i` spending an output locked by `script_pubkey`:
/// 1. scriptSig must be push-only; execute it on an empty stack
/// 2. Execute scriptPubKey on the result; the top must be true
/// 3. If scriptPubKey is a script-hash commitment, pop the revealed script
///    from the scriptSig's stack and execute it on the remainder
/// 4. Exactly one true value must remain
pub fn verify_spend(tx: &Transaction, input_index: usize, script_pubkey: &[u8]) -> Result<bool> {
    let ctx = SpendContext::new(tx, input_index)?;
    let script_sig = &ctx.input().script_sig;

    if crate::script::parse_unlocking_script(script_sig).is_err() {
        debug!(input_index, "scriptSig is not push-only");
        return Ok(false);
    }

    let mut stack = Vec::new();
    if !execute_script(script_sig, &mut stack, &ctx)? {
        return Ok(false);
    }
    let after_script_sig = stack.clone();

    if !execute_script(script_pubkey, &mut stack, &ctx)? {
        return Ok(false);
    }
    if !stack.last().is_some_and(|top| cast_to_bool(top)) {
        debug!(input_index, "scriptPubKey left a false value");
        return Ok(false);
    }

    if extract_script_hash(script_pubkey).is_some() {
        stack = after_script_sig;
        let Some(redeem_script) = stack.pop() else {
            return Ok(false);
        };
        if !execute_script(&redeem_script, &mut stack, &ctx)? {
            return Ok(false);
        }
    }

    Ok(stack.len() == 1 && cast_to_bool(&stack[0]))
}

/// CheckLockTime: ℤ × 𝒞 → {true, false}
///
/// 1. Operand is non-negative
/// 2. Operand and tx lock time are both heights or both timestamps
/// 3. Operand ≤ tx lock time
/// 4. The executing input is not final (a final input disables lock time)
pub fn check_lock_time(lock_time: i64, ctx: &SpendContext) -> bool {
    if lock_time < 0 {
        return false;
    }
    let tx_lock_time = ctx.tx.lock_time as i64;
    let threshold = LOCKTIME_THRESHOLD as i64;
    if (lock_time < threshold) != (tx_lock_time < threshold) {
        return false;
    }
    if lock_time > tx_lock_time {
        return false;
    }
    ctx.input().sequence != SEQUENCE_FINAL
}

/// Script code with every push of `signature` removed.
fn find_and_delete(script_code: &[u8], signature: &[u8]) -> ByteString {
    let mut pattern = Vec::with_capacity(signature.len() + 2);
    push_data(&mut pattern, signature);

    let mut out = Vec::with_capacity(script_code.len());
    let mut pos = 0;
    while pos < script_code.len() {
        match read_instruction(script_code, pos) {
            Ok((_, next)) => {
                if script_code[pos..next] != pattern[..] {
                    out.extend_from_slice(&script_code[pos..next]);
                }
                pos = next;
            }
            Err(_) => {
                out.extend_from_slice(&script_code[pos..]);
                break;
            }
        }
    }
    out
}

/// Execute a single non-push opcode
fn execute_opcode(opcode: u8, stack: &mut Vec<ByteString>, script_code: &[u8], ctx: &SpendContext) -> Result<bool> {
    match opcode {
        // OP_1NEGATE, OP_1 to OP_16
        OP_1NEGATE | OP_1..=OP_16 => {
            stack.push(script_num::serialize_script_num(small_int_value(opcode)));
            Ok(true)
        }

        OP_NOP => Ok(true),

        OP_VERIFY => Ok(stack.pop().is_some_and(|top| cast_to_bool(&top))),

        OP_DROP => Ok(stack.pop().is_some()),

        OP_DUP => {
            if let Some(item) = stack.last().cloned() {
                stack.push(item);
                Ok(true)
            } else {
                Ok(false)
            }
        }

        OP_EQUAL | OP_EQUALVERIFY => {
            let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                return Ok(false);
            };
            let equal = a == b;
            if opcode == OP_EQUALVERIFY {
                Ok(equal)
            } else {
                stack.push(bool_element(equal));
                Ok(true)
            }
        }

        // RIPEMD160(SHA256(x))
        OP_HASH160 => {
            if let Some(item) = stack.pop() {
                stack.push(hash160(&item).to_vec());
                Ok(true)
            } else {
                Ok(false)
            }
        }

        OP_CHECKSIG | OP_CHECKSIGVERIFY => {
            let (Some(pubkey), Some(signature)) = (stack.pop(), stack.pop()) else {
                return Ok(false);
            };
            let valid = match signature.last() {
                Some(&flag) => {
                    let script_code = find_and_delete(script_code, &signature);
                    let digest = sighash::compute_sighash(ctx.tx, ctx.input_index, &script_code, flag as u32)?;
                    sighash::verify(&digest, &signature, &pubkey)
                }
                None => false,
            };
            if opcode == OP_CHECKSIGVERIFY {
                Ok(valid)
            } else {
                stack.push(bool_element(valid));
                Ok(true)
            }
        }

        // BIP65: the operand stays on the stack
        OP_CHECKLOCKTIMEVERIFY => {
            let Some(top) = stack.last() else {
                return Ok(false);
            };
            match script_num::decode(top, MAX_LOCKTIME_NUM_LEN) {
                Ok(lock_time) => Ok(check_lock_time(lock_time, ctx)),
                Err(e) => {
                    debug!(error = %e, "bad lock-time operand");
                    Ok(false)
                }
            }
        }

        // Unknown or disabled opcode
        _ => Ok(false),
    }
}
