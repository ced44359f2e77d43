//! Typed accessors for each ledger sub-store.
//!
//! Every map offers the same small vocabulary (get, contains, put, delete)
//! and nothing more. Cross-entity consistency is the transaction engine's
//! job; the maps just hold rows.

use super::block::BlockRecord;
use super::db::{DatabaseSet, DbError, DbResult, Table};
use crate::account::Address;
use crate::assets::{Asset, Order, Trade};
use crate::config::{FIRST_ISSUED_ASSET_KEY, SIGNATURE_LENGTH};
use crate::crypto::Signature;
use crate::naming::{Name, NameSale};
use crate::transaction::undo::UndoRecord;
use crate::transaction::Amount;
use crate::voting::Poll;

const META_NEXT_ASSET_KEY: &[u8] = b"next_asset_key";
const META_CHAIN_HEIGHT: &[u8] = b"chain_height";

fn balance_key(address: &Address, asset: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&asset.to_be_bytes());
    key
}

/// Order-book key: pair, then price, then age, so a prefix scan over a pair
/// yields the cheapest and then oldest orders first.
fn book_key(order: &Order) -> Vec<u8> {
    let mut key = book_prefix(order.have, order.want);
    key.extend_from_slice(&(order.price.units() as u64 ^ (1 << 63)).to_be_bytes());
    key.extend_from_slice(&(order.timestamp as u64 ^ (1 << 63)).to_be_bytes());
    key.extend_from_slice(order.id.as_bytes());
    key
}

fn book_prefix(have: u64, want: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + SIGNATURE_LENGTH);
    key.extend_from_slice(&have.to_be_bytes());
    key.extend_from_slice(&want.to_be_bytes());
    key
}

fn trade_key(initiator: &Signature, target: &Signature) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 * SIGNATURE_LENGTH);
    key.extend_from_slice(initiator.as_bytes());
    key.extend_from_slice(target.as_bytes());
    key
}

impl DatabaseSet {
    // -- Balances -------------------------------------------------------------

    pub fn balance(&self, address: &Address, asset: u64) -> DbResult<Amount> {
        match self.get_raw(Table::Balances, &balance_key(address, asset))? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| DbError::Corrupt {
                    tree: Table::Balances.name(),
                    detail: format!("balance of {} is {} bytes", address, bytes.len()),
                })?;
                Ok(Amount::from_units(i64::from_be_bytes(arr)))
            }
            None => Ok(Amount::ZERO),
        }
    }

    /// Set a balance. Zero deletes the row so that an emptied account and a
    /// never-funded one are indistinguishable.
    pub fn set_balance(&mut self, address: &Address, asset: u64, amount: Amount) -> DbResult<()> {
        let key = balance_key(address, asset);
        if amount.is_zero() {
            self.delete(Table::Balances, &key)
        } else {
            self.put_raw(Table::Balances, &key, amount.units().to_be_bytes().to_vec())
        }
    }

    /// Every non-zero balance held by `address`, by asset key.
    pub fn balances_of(&self, address: &Address) -> DbResult<Vec<(u64, Amount)>> {
        self.scan_raw(Table::Balances, address.as_bytes())?
            .into_iter()
            .map(|(key, value)| {
                let corrupt = || DbError::Corrupt {
                    tree: Table::Balances.name(),
                    detail: format!("malformed balance row for {}", address),
                };
                let asset = <[u8; 8]>::try_from(&key[key.len().min(25)..]).map_err(|_| corrupt())?;
                let units: [u8; 8] = value.as_slice().try_into().map_err(|_| corrupt())?;
                Ok((
                    u64::from_be_bytes(asset),
                    Amount::from_units(i64::from_be_bytes(units)),
                ))
            })
            .collect()
    }

    // -- References -----------------------------------------------------------

    pub fn reference(&self, address: &Address) -> DbResult<Option<Signature>> {
        match self.get_raw(Table::References, address.as_bytes())? {
            Some(bytes) => Signature::try_from_slice(&bytes)
                .map(Some)
                .map_err(|e| DbError::Corrupt {
                    tree: Table::References.name(),
                    detail: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// `None` removes the reference.
    pub fn set_reference(
        &mut self,
        address: &Address,
        reference: Option<&Signature>,
    ) -> DbResult<()> {
        match reference {
            Some(sig) => {
                self.put_raw(Table::References, address.as_bytes(), sig.as_bytes().to_vec())
            }
            None => self.delete(Table::References, address.as_bytes()),
        }
    }

    // -- Names ----------------------------------------------------------------

    pub fn name(&self, name: &str) -> DbResult<Option<Name>> {
        self.get_value(Table::Names, name.as_bytes())
    }

    pub fn contains_name(&self, name: &str) -> DbResult<bool> {
        Ok(self.get_raw(Table::Names, name.as_bytes())?.is_some())
    }

    pub fn put_name(&mut self, name: &Name) -> DbResult<()> {
        self.put_value(Table::Names, name.name.as_bytes(), name)
    }

    pub fn delete_name(&mut self, name: &str) -> DbResult<()> {
        self.delete(Table::Names, name.as_bytes())
    }

    /// Names owned by `owner`, in name order.
    pub fn names_owned_by(&self, owner: &Address) -> DbResult<Vec<Name>> {
        Ok(self
            .scan_values::<Name>(Table::Names, &[])?
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| &name.owner == owner)
            .collect())
    }

    // -- Name sales -----------------------------------------------------------

    pub fn name_sale(&self, name: &str) -> DbResult<Option<NameSale>> {
        self.get_value(Table::NameSales, name.as_bytes())
    }

    pub fn contains_name_sale(&self, name: &str) -> DbResult<bool> {
        Ok(self.get_raw(Table::NameSales, name.as_bytes())?.is_some())
    }

    pub fn put_name_sale(&mut self, sale: &NameSale) -> DbResult<()> {
        self.put_value(Table::NameSales, sale.name.as_bytes(), sale)
    }

    pub fn delete_name_sale(&mut self, name: &str) -> DbResult<()> {
        self.delete(Table::NameSales, name.as_bytes())
    }

    pub fn name_sales(&self) -> DbResult<Vec<NameSale>> {
        Ok(self
            .scan_values::<NameSale>(Table::NameSales, &[])?
            .into_iter()
            .map(|(_, sale)| sale)
            .collect())
    }

    // -- Assets ---------------------------------------------------------------

    pub fn asset(&self, key: u64) -> DbResult<Option<Asset>> {
        self.get_value(Table::Assets, &key.to_be_bytes())
    }

    pub fn contains_asset(&self, key: u64) -> DbResult<bool> {
        Ok(self.get_raw(Table::Assets, &key.to_be_bytes())?.is_some())
    }

    pub fn put_asset(&mut self, asset: &Asset) -> DbResult<()> {
        self.put_value(Table::Assets, &asset.key.to_be_bytes(), asset)
    }

    pub fn delete_asset(&mut self, key: u64) -> DbResult<()> {
        self.delete(Table::Assets, &key.to_be_bytes())
    }

    /// Key the next IssueAsset will receive.
    pub fn next_asset_key(&self) -> DbResult<u64> {
        Ok(self
            .get_u64(Table::Metadata, META_NEXT_ASSET_KEY)?
            .unwrap_or(FIRST_ISSUED_ASSET_KEY))
    }

    /// Writing the initial value deletes the row, keeping a fresh ledger
    /// byte-identical to one that issued and then orphaned an asset.
    pub fn set_next_asset_key(&mut self, key: u64) -> DbResult<()> {
        if key == FIRST_ISSUED_ASSET_KEY {
            self.delete(Table::Metadata, META_NEXT_ASSET_KEY)
        } else {
            self.put_u64(Table::Metadata, META_NEXT_ASSET_KEY, key)
        }
    }

    // -- Orders ---------------------------------------------------------------

    pub fn order(&self, id: &Signature) -> DbResult<Option<Order>> {
        self.get_value(Table::Orders, id.as_bytes())
    }

    /// Insert or update an open order and its book entry.
    pub fn put_order(&mut self, order: &Order) -> DbResult<()> {
        if let Some(previous) = self.order(&order.id)? {
            self.delete(Table::OrderBook, &book_key(&previous))?;
        }
        self.put_value(Table::Orders, order.id.as_bytes(), order)?;
        self.put_raw(Table::OrderBook, &book_key(order), Vec::new())
    }

    pub fn delete_order(&mut self, id: &Signature) -> DbResult<()> {
        if let Some(order) = self.order(id)? {
            self.delete(Table::OrderBook, &book_key(&order))?;
        }
        self.delete(Table::Orders, id.as_bytes())
    }

    /// Open orders offering `have` for `want`, cheapest first, then oldest.
    pub fn orders_for_pair(&self, have: u64, want: u64) -> DbResult<Vec<Order>> {
        let mut orders = Vec::new();
        for (key, _) in self.scan_raw(Table::OrderBook, &book_prefix(have, want))? {
            let id_bytes = &key[key.len().saturating_sub(SIGNATURE_LENGTH)..];
            let id = Signature::try_from_slice(id_bytes).map_err(|e| DbError::Corrupt {
                tree: Table::OrderBook.name(),
                detail: e.to_string(),
            })?;
            match self.order(&id)? {
                Some(order) => orders.push(order),
                None => {
                    return Err(DbError::Corrupt {
                        tree: Table::OrderBook.name(),
                        detail: format!("book entry without order {}", id.short()),
                    })
                }
            }
        }
        Ok(orders)
    }

    pub fn completed_order(&self, id: &Signature) -> DbResult<Option<Order>> {
        self.get_value(Table::CompletedOrders, id.as_bytes())
    }

    pub fn put_completed_order(&mut self, order: &Order) -> DbResult<()> {
        self.put_value(Table::CompletedOrders, order.id.as_bytes(), order)
    }

    pub fn delete_completed_order(&mut self, id: &Signature) -> DbResult<()> {
        self.delete(Table::CompletedOrders, id.as_bytes())
    }

    // -- Trades ---------------------------------------------------------------

    pub fn put_trade(&mut self, trade: &Trade) -> DbResult<()> {
        self.put_value(Table::Trades, &trade_key(&trade.initiator, &trade.target), trade)
    }

    pub fn delete_trade(&mut self, trade: &Trade) -> DbResult<()> {
        self.delete(Table::Trades, &trade_key(&trade.initiator, &trade.target))
    }

    /// Trades initiated by the order `initiator`.
    pub fn trades_initiated_by(&self, initiator: &Signature) -> DbResult<Vec<Trade>> {
        Ok(self
            .scan_values::<Trade>(Table::Trades, initiator.as_bytes())?
            .into_iter()
            .map(|(_, trade)| trade)
            .collect())
    }

    // -- Polls ----------------------------------------------------------------

    pub fn poll(&self, name: &str) -> DbResult<Option<Poll>> {
        self.get_value(Table::Polls, name.as_bytes())
    }

    pub fn contains_poll(&self, name: &str) -> DbResult<bool> {
        Ok(self.get_raw(Table::Polls, name.as_bytes())?.is_some())
    }

    pub fn put_poll(&mut self, poll: &Poll) -> DbResult<()> {
        self.put_value(Table::Polls, poll.name.as_bytes(), poll)
    }

    pub fn delete_poll(&mut self, name: &str) -> DbResult<()> {
        self.delete(Table::Polls, name.as_bytes())
    }

    // -- Blocks ---------------------------------------------------------------

    pub fn block(&self, height: u64) -> DbResult<Option<BlockRecord>> {
        self.get_value(Table::Blocks, &height.to_be_bytes())
    }

    pub fn block_by_signature(&self, signature: &[u8; 32]) -> DbResult<Option<BlockRecord>> {
        match self.get_u64(Table::BlockIndex, signature)? {
            Some(height) => self.block(height),
            None => Ok(None),
        }
    }

    /// Height of the newest block, `None` before the first one.
    pub fn chain_height(&self) -> DbResult<Option<u64>> {
        self.get_u64(Table::Metadata, META_CHAIN_HEIGHT)
    }

    pub fn last_block(&self) -> DbResult<Option<BlockRecord>> {
        match self.chain_height()? {
            Some(height) => self.block(height),
            None => Ok(None),
        }
    }

    /// Append `block` to the index and make it the chain tip.
    pub fn put_block(&mut self, block: &BlockRecord) -> DbResult<()> {
        self.put_value(Table::Blocks, &block.height.to_be_bytes(), block)?;
        self.put_u64(Table::BlockIndex, &block.signature, block.height)?;
        self.put_u64(Table::Metadata, META_CHAIN_HEIGHT, block.height)
    }

    /// Remove the tip `block`, making its parent the tip.
    pub fn delete_block(&mut self, block: &BlockRecord) -> DbResult<()> {
        self.delete(Table::Blocks, &block.height.to_be_bytes())?;
        self.delete(Table::BlockIndex, &block.signature)?;
        match block.height.checked_sub(1) {
            Some(parent) => self.put_u64(Table::Metadata, META_CHAIN_HEIGHT, parent),
            None => self.delete(Table::Metadata, META_CHAIN_HEIGHT),
        }
    }

    // -- Raw transactions -----------------------------------------------------

    pub fn raw_transaction(&self, signature: &Signature) -> DbResult<Option<Vec<u8>>> {
        self.get_raw(Table::Transactions, signature.as_bytes())
    }

    pub fn put_raw_transaction(&mut self, signature: &Signature, bytes: Vec<u8>) -> DbResult<()> {
        self.put_raw(Table::Transactions, signature.as_bytes(), bytes)
    }

    pub fn delete_raw_transaction(&mut self, signature: &Signature) -> DbResult<()> {
        self.delete(Table::Transactions, signature.as_bytes())
    }

    // -- Undo log -------------------------------------------------------------

    pub fn undo_record(&self, signature: &Signature) -> DbResult<Option<UndoRecord>> {
        self.get_value(Table::Undo, signature.as_bytes())
    }

    pub fn put_undo_record(&mut self, signature: &Signature, record: &UndoRecord) -> DbResult<()> {
        self.put_value(Table::Undo, signature.as_bytes(), record)
    }

    pub fn delete_undo_record(&mut self, signature: &Signature) -> DbResult<()> {
        self.delete(Table::Undo, signature.as_bytes())
    }
}
