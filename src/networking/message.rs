//! Template-message reader used by the avatar handlers
//!
//! Messages arrive already split into blocks, block instances and named
//! variables (the message template). Handlers walk them with a cursor, the
//! same way the wire deserializer lays them out: read a value and the cursor
//! moves to the next variable, wrapping into the next instance and block.

use crate::networking::{NetworkError, NetworkResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Cursor-based access to an assembled inbound message
pub trait MessageReader {
    /// Move the cursor back to the first variable of the first block
    fn reset_reading(&mut self);

    fn read_u8(&mut self) -> NetworkResult<u8>;
    fn read_u32(&mut self) -> NetworkResult<u32>;
    fn read_s32(&mut self) -> NetworkResult<i32>;
    fn read_u64(&mut self) -> NetworkResult<u64>;
    fn read_uuid(&mut self) -> NetworkResult<Uuid>;

    /// Read the current variable as text (trailing NULs removed, lossy UTF-8)
    fn read_string(&mut self) -> NetworkResult<String>;

    /// Read the current variable's raw bytes, whatever its length
    fn read_buffer(&mut self) -> NetworkResult<Bytes>;

    /// Skip the current variable without interpreting it
    fn skip_to_next_variable(&mut self) -> NetworkResult<()>;

    /// Move forward within the current block instance to the named variable.
    /// Fails if the previous read already used up the instance.
    fn skip_to_first_variable_by_name(&mut self, name: &str) -> NetworkResult<()>;

    /// Number of instances of the block under the cursor. A block with no
    /// instances is stepped over so the next block can be read.
    fn read_current_block_instance_count(&mut self) -> usize;

    /// Move to the first variable of the next block instance
    fn skip_to_next_instance_start(&mut self);
}

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    data: Bytes,
}

#[derive(Debug, Clone)]
struct Block {
    name: String,
    instances: Vec<Vec<Variable>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    block: usize,
    instance: usize,
    variable: usize,
    /// Set when the last read stepped into a fresh instance
    wrapped: bool,
}

/// In-memory template message
#[derive(Debug, Clone)]
pub struct InboundMessage {
    name: String,
    blocks: Vec<Block>,
    cursor: Cursor,
}

impl InboundMessage {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn current(&self) -> NetworkResult<&Variable> {
        let Cursor { block, instance, variable, .. } = self.cursor;
        self.blocks
            .get(block)
            .and_then(|b| b.instances.get(instance))
            .and_then(|vars| vars.get(variable))
            .ok_or_else(|| NetworkError::PacketDecode {
                reason: format!(
                    "read past end of message {} (block {}, instance {}, variable {})",
                    self.name, block, instance, variable
                ),
            })
    }

    fn advance(&mut self) {
        let Some(block) = self.blocks.get(self.cursor.block) else {
            return;
        };
        let vars_in_instance = block
            .instances
            .get(self.cursor.instance)
            .map(|v| v.len())
            .unwrap_or(0);

        self.cursor.variable += 1;
        self.cursor.wrapped = false;
        if self.cursor.variable >= vars_in_instance {
            self.next_instance();
            self.cursor.wrapped = true;
        }
    }

    fn next_instance(&mut self) {
        let Some(block) = self.blocks.get(self.cursor.block) else {
            return;
        };
        if self.cursor.instance + 1 < block.instances.len() {
            self.cursor.instance += 1;
            self.cursor.variable = 0;
        } else {
            self.cursor = Cursor { block: self.cursor.block + 1, ..Cursor::default() };
        }
    }

    /// Fetch the current variable, check its width and step past it
    fn take_fixed(&mut self, width: usize) -> NetworkResult<Bytes> {
        let var = self.current()?;
        if var.data.len() < width {
            return Err(NetworkError::PacketDecode {
                reason: format!(
                    "variable {} holds {} bytes, need {}",
                    var.name,
                    var.data.len(),
                    width
                ),
            });
        }
        let data = var.data.clone();
        self.advance();
        Ok(data)
    }
}

impl MessageReader for InboundMessage {
    fn reset_reading(&mut self) {
        self.cursor = Cursor::default();
    }

    fn read_u8(&mut self) -> NetworkResult<u8> {
        Ok(self.take_fixed(1)?.get_u8())
    }

    fn read_u32(&mut self) -> NetworkResult<u32> {
        Ok(self.take_fixed(4)?.get_u32_le())
    }

    fn read_s32(&mut self) -> NetworkResult<i32> {
        Ok(self.take_fixed(4)?.get_i32_le())
    }

    fn read_u64(&mut self) -> NetworkResult<u64> {
        Ok(self.take_fixed(8)?.get_u64_le())
    }

    fn read_uuid(&mut self) -> NetworkResult<Uuid> {
        let data = self.take_fixed(16)?;
        Uuid::from_slice(&data[..16]).map_err(|e| NetworkError::PacketDecode {
            reason: format!("invalid UUID: {}", e),
        })
    }

    fn read_string(&mut self) -> NetworkResult<String> {
        let data = self.read_buffer()?;
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        Ok(String::from_utf8_lossy(&data[..end]).into_owned())
    }

    fn read_buffer(&mut self) -> NetworkResult<Bytes> {
        let data = self.current()?.data.clone();
        self.advance();
        Ok(data)
    }

    fn skip_to_next_variable(&mut self) -> NetworkResult<()> {
        self.current()?;
        self.advance();
        Ok(())
    }

    fn skip_to_first_variable_by_name(&mut self, name: &str) -> NetworkResult<()> {
        let Cursor { block, instance, variable, wrapped } = self.cursor;
        if wrapped {
            return Err(NetworkError::FieldNotFound { name: name.to_string() });
        }
        let position = self
            .blocks
            .get(block)
            .and_then(|b| b.instances.get(instance))
            .and_then(|vars| vars.iter().skip(variable).position(|v| v.name == name));

        match position {
            Some(offset) => {
                self.cursor.variable = variable + offset;
                self.cursor.wrapped = false;
                Ok(())
            }
            None => Err(NetworkError::FieldNotFound { name: name.to_string() }),
        }
    }

    fn read_current_block_instance_count(&mut self) -> usize {
        let count = self
            .blocks
            .get(self.cursor.block)
            .map(|b| b.instances.len())
            .unwrap_or(0);
        if count == 0 && self.cursor.block < self.blocks.len() {
            self.cursor = Cursor { block: self.cursor.block + 1, ..Cursor::default() };
        }
        self.cursor.wrapped = false;
        count
    }

    /// No-op right after a read that already finished the instance
    fn skip_to_next_instance_start(&mut self) {
        if std::mem::take(&mut self.cursor.wrapped) {
            return;
        }
        self.next_instance();
    }
}

/// Builder for [`InboundMessage`], mostly used by tests and the replay tool
#[derive(Debug)]
pub struct MessageBuilder {
    name: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), blocks: Vec::new() }
    }

    /// Start a single-instance block
    pub fn block(mut self, name: impl Into<String>) -> Self {
        self.blocks.push(Block { name: name.into(), instances: vec![Vec::new()] });
        self
    }

    /// Start a variable block; add instances with [`MessageBuilder::instance`]
    pub fn variable_block(mut self, name: impl Into<String>) -> Self {
        self.blocks.push(Block { name: name.into(), instances: Vec::new() });
        self
    }

    /// Start a new instance in the last block
    pub fn instance(mut self) -> Self {
        if let Some(block) = self.blocks.last_mut() {
            block.instances.push(Vec::new());
        }
        self
    }

    fn push(mut self, name: &str, data: Bytes) -> Self {
        if let Some(vars) = self.blocks.last_mut().and_then(|b| b.instances.last_mut()) {
            vars.push(Variable { name: name.to_string(), data });
        }
        self
    }

    fn push_with(self, name: &str, width: usize, fill: impl FnOnce(&mut BytesMut)) -> Self {
        let mut buf = BytesMut::with_capacity(width);
        fill(&mut buf);
        self.push(name, buf.freeze())
    }

    pub fn add_u8(self, name: &str, value: u8) -> Self {
        self.push_with(name, 1, |b| b.put_u8(value))
    }

    pub fn add_u16(self, name: &str, value: u16) -> Self {
        self.push_with(name, 2, |b| b.put_u16_le(value))
    }

    pub fn add_u32(self, name: &str, value: u32) -> Self {
        self.push_with(name, 4, |b| b.put_u32_le(value))
    }

    pub fn add_s32(self, name: &str, value: i32) -> Self {
        self.push_with(name, 4, |b| b.put_i32_le(value))
    }

    pub fn add_u64(self, name: &str, value: u64) -> Self {
        self.push_with(name, 8, |b| b.put_u64_le(value))
    }

    pub fn add_uuid(self, name: &str, value: Uuid) -> Self {
        self.push(name, Bytes::copy_from_slice(value.as_bytes()))
    }

    pub fn add_string(self, name: &str, value: &str) -> Self {
        self.push(name, Bytes::copy_from_slice(value.as_bytes()))
    }

    pub fn add_buffer(self, name: &str, value: &[u8]) -> Self {
        self.push(name, Bytes::copy_from_slice(value))
    }

    pub fn build(self) -> InboundMessage {
        InboundMessage { name: self.name, blocks: self.blocks, cursor: Cursor::default() }
    }
}
