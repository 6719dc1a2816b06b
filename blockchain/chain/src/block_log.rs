// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Append-only block log.
//!
//! The log is a sequence of `[serialized block][u64 start offset]` records;
//! a companion `.index` file of `u64` offsets gives O(1) seeks by height.
//! Only irreversible blocks are ever appended.

use crate::errors::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use freezone_blocks::SignedBlock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct BlockLog {
    log: File,
    index: File,
    log_path: PathBuf,
    head: Option<SignedBlock>,
}

impl BlockLog {
    /// Opens (or creates) the log at `<dir>/block_log`. A truncated index is
    /// rebuilt from the log tail pointers.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log_path = dir.join("block_log");
        let index_path = dir.join("block_log.index");
        let log = OpenOptions::new().read(true).append(true).create(true).open(&log_path)?;
        let index = OpenOptions::new().read(true).append(true).create(true).open(&index_path)?;

        let mut this = BlockLog { log, index, log_path, head: None };

        let log_len = this.log.metadata()?.len();
        let index_len = this.index.metadata()?.len();
        if log_len > 0 && index_len == 0 {
            this.rebuild_index()?;
        } else if index_len % 8 != 0 {
            return Err(Error::fatal(format!(
                "block log index {} has a partial entry",
                this.log_path.display()
            )));
        }
        if log_len > 0 {
            let head = this.read_head()?;
            this.head = Some(head);
        }
        Ok(this)
    }

    pub fn head(&self) -> Option<&SignedBlock> {
        self.head.as_ref()
    }

    pub fn head_block_num(&self) -> u32 {
        self.head.as_ref().map(|b| b.block_num()).unwrap_or(0)
    }

    /// Appends an irreversible block and its index entry.
    pub fn append(&mut self, block: &SignedBlock) -> Result<u64> {
        let expected = self.head_block_num() + 1;
        if block.block_num() != expected {
            return Err(Error::fatal(format!(
                "block log append out of order: expected {expected}, got {}",
                block.block_num()
            )));
        }
        let offset = self.log.seek(SeekFrom::End(0))?;
        let bytes = serde_cbor::to_vec(block)?;
        let mut tail = [0u8; 8];
        LittleEndian::write_u64(&mut tail, offset);
        self.log.write_all(&bytes)?;
        self.log.write_all(&tail)?;
        self.index.write_all(&tail)?;
        self.head = Some(block.clone());
        Ok(offset)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.log.flush()?;
        self.index.flush()?;
        Ok(())
    }

    /// Reads the block starting at a byte offset, ending where the next
    /// record (or the file) ends.
    pub fn read_block(&mut self, offset: u64, end: u64) -> Result<SignedBlock> {
        if end <= offset + 8 {
            return Err(Error::fatal("block log record is truncated"));
        }
        let len = (end - offset - 8) as usize;
        let mut buf = vec![0u8; len];
        self.log.seek(SeekFrom::Start(offset))?;
        self.log.read_exact(&mut buf)?;
        let block: SignedBlock = serde_cbor::from_slice(&buf)
            .map_err(|e| Error::fatal(format!("block log corrupt at offset {offset}: {e}")))?;
        Ok(block)
    }

    /// Reads the block at a height via the index.
    pub fn read_block_by_num(&mut self, block_num: u32) -> Result<Option<SignedBlock>> {
        if block_num == 0 || block_num > self.head_block_num() {
            return Ok(None);
        }
        let offset = self.index_entry(block_num)?;
        let end = if block_num == self.head_block_num() {
            self.log.metadata()?.len()
        } else {
            self.index_entry(block_num + 1)?
        };
        let block = self.read_block(offset, end)?;
        if block.block_num() != block_num {
            return Err(Error::fatal(format!(
                "block log height mismatch: wanted {block_num}, found {}",
                block.block_num()
            )));
        }
        Ok(Some(block))
    }

    fn index_entry(&mut self, block_num: u32) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.index.seek(SeekFrom::Start((block_num as u64 - 1) * 8))?;
        self.index.read_exact(&mut buf)?;
        Ok(LittleEndian::read_u64(&buf))
    }

    fn read_head(&mut self) -> Result<SignedBlock> {
        let len = self.log.metadata()?.len();
        if len < 8 {
            return Err(Error::fatal("block log is truncated"));
        }
        let mut tail = [0u8; 8];
        self.log.seek(SeekFrom::Start(len - 8))?;
        self.log.read_exact(&mut tail)?;
        let offset = LittleEndian::read_u64(&tail);
        self.read_block(offset, len)
    }

    /// Reconstructs the `.index` file by walking the log backwards through
    /// the per-record tail pointers.
    fn rebuild_index(&mut self) -> Result<()> {
        log::info!("rebuilding block log index for {}", self.log_path.display());
        let mut offsets = Vec::new();
        let mut end = self.log.metadata()?.len();
        while end > 0 {
            if end < 8 {
                return Err(Error::fatal("block log is truncated"));
            }
            let mut tail = [0u8; 8];
            self.log.seek(SeekFrom::Start(end - 8))?;
            self.log.read_exact(&mut tail)?;
            let offset = LittleEndian::read_u64(&tail);
            if offset >= end {
                return Err(Error::fatal("block log tail pointer out of bounds"));
            }
            offsets.push(offset);
            end = offset;
        }
        offsets.reverse();
        let mut buf = Vec::with_capacity(offsets.len() * 8);
        for offset in offsets {
            let mut entry = [0u8; 8];
            LittleEndian::write_u64(&mut entry, offset);
            buf.extend_from_slice(&entry);
        }
        self.index.write_all(&buf)?;
        self.index.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezone_blocks::{BlockHeader, BlockId};
    use freezone_types::{AccountName, TimePointSec};

    fn block(num: u32) -> SignedBlock {
        let previous = if num == 1 {
            BlockId::default()
        } else {
            BlockId::new([num as u8; 32], num - 1)
        };
        SignedBlock::new(
            BlockHeader {
                previous,
                timestamp: TimePointSec(num * 3),
                witness: AccountName::unchecked("initwitness"),
                transaction_merkle_root: [0u8; 32],
                extensions: vec![],
            },
            vec![],
        )
    }

    #[test]
    fn append_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = BlockLog::open(dir.path()).unwrap();
        for n in 1..=5 {
            log.append(&block(n)).unwrap();
        }
        log.flush().unwrap();
        assert_eq!(log.head_block_num(), 5);
        for n in 1..=5 {
            let b = log.read_block_by_num(n).unwrap().unwrap();
            assert_eq!(b.block_num(), n);
        }
        assert!(log.read_block_by_num(6).unwrap().is_none());
    }

    #[test]
    fn reopen_restores_head() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = BlockLog::open(dir.path()).unwrap();
            log.append(&block(1)).unwrap();
            log.append(&block(2)).unwrap();
            log.flush().unwrap();
        }
        let mut log = BlockLog::open(dir.path()).unwrap();
        assert_eq!(log.head_block_num(), 2);
        assert_eq!(log.read_block_by_num(1).unwrap().unwrap().block_num(), 1);
    }

    #[test]
    fn out_of_order_append_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = BlockLog::open(dir.path()).unwrap();
        log.append(&block(1)).unwrap();
        assert!(log.append(&block(3)).is_err());
    }

    #[test]
    fn index_is_rebuilt_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = BlockLog::open(dir.path()).unwrap();
            for n in 1..=3 {
                log.append(&block(n)).unwrap();
            }
            log.flush().unwrap();
        }
        std::fs::remove_file(dir.path().join("block_log.index")).unwrap();
        let mut log = BlockLog::open(dir.path()).unwrap();
        assert_eq!(log.read_block_by_num(2).unwrap().unwrap().block_num(), 2);
    }
}
