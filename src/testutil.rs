//! Transaction and block fixtures used across unit tests.

use crate::chain::{Block, BlockMeta};
use crate::filter::{OP_RETURN, SIDETREE_TAG};
use alloy_primitives::B256;
use bitcoin::absolute::LockTime;
use bitcoin::blockdata::block::{Header, Version};
use bitcoin::blockdata::transaction::Version as TxVersion;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::{
    Amount, BlockHash, CompactTarget, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxMerkleNode, TxOut, Txid, Witness,
};

/// `OP_RETURN <41> "sidetree:" <hash>`
pub fn anchor_script(hash: [u8; 32]) -> Vec<u8> {
    let mut script = vec![OP_RETURN, 41];
    script.extend_from_slice(SIDETREE_TAG);
    script.extend_from_slice(&hash);
    script
}

/// One-input transaction builder. The seed makes the spent outpoint unique.
pub struct TxBuilder {
    prevout: [u8; 32],
    outputs: Vec<TxOut>,
    witness: Vec<Vec<u8>>,
}

impl TxBuilder {
    pub fn new(seed: u32) -> Self {
        let mut prevout = [0u8; 32];
        prevout[..4].copy_from_slice(&seed.to_le_bytes());
        Self {
            prevout,
            outputs: Vec::new(),
            witness: Vec::new(),
        }
    }

    pub fn output(mut self, sats: u64, script: Vec<u8>) -> Self {
        self.outputs.push(TxOut {
            value: Amount::from_sat(sats),
            script_pubkey: ScriptBuf::from_bytes(script),
        });
        self
    }

    pub fn witness(mut self, items: Vec<Vec<u8>>) -> Self {
        self.witness = items;
        self
    }

    pub fn build(&self) -> Transaction {
        Transaction {
            version: TxVersion::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array(self.prevout),
                    vout: 0,
                },
                script_sig: ScriptBuf::from_bytes(vec![0x51]),
                sequence: Sequence::ENABLE_LOCKTIME_NO_RBF,
                witness: Witness::from_slice(&self.witness),
            }],
            output: self.outputs.clone(),
        }
    }
}

/// Block builder producing consensus bytes.
pub struct BlockBuilder {
    prev_block: B256,
    time: u32,
    txs: Vec<Transaction>,
}

impl BlockBuilder {
    pub fn new(prev_block: B256, time: u32) -> Self {
        Self {
            prev_block,
            time,
            txs: Vec::new(),
        }
    }

    pub fn tx(mut self, tx: Transaction) -> Self {
        self.txs.push(tx);
        self
    }

    pub fn txs(mut self, txs: Vec<Transaction>) -> Self {
        self.txs.extend(txs);
        self
    }

    pub fn build_raw(&self) -> Vec<u8> {
        let mut block = bitcoin::Block {
            header: Header {
                version: Version::TWO,
                prev_blockhash: BlockHash::from_byte_array(self.prev_block.0),
                merkle_root: TxMerkleNode::all_zeros(),
                time: self.time,
                bits: CompactTarget::from_consensus(0x207f_ffff),
                nonce: 0,
            },
            txdata: self.txs.clone(),
        };
        if let Some(root) = block.compute_merkle_root() {
            block.header.merkle_root = root;
        }
        encode::serialize(&block)
    }

    pub fn build(&self, height: u32) -> (BlockMeta, Block, Vec<u8>) {
        let raw = self.build_raw();
        let block = Block::decode(&raw).unwrap();
        let meta = BlockMeta {
            height,
            hash: block.hash(),
        };
        (meta, block, raw)
    }
}
