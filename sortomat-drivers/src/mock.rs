//! Recording register bus for driver tests

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use sortomat_hal::RegisterBus;

/// One bus call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    WriteRegister(u8, u8, u8),
    ReadRegister(u8, u8),
    Write(u8, Vec<u8>),
    Read(u8, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nack;

#[derive(Default)]
struct Inner {
    ops: Vec<Op>,
    replies: HashMap<u8, VecDeque<Vec<u8>>>,
    fallback: HashMap<u8, Vec<u8>>,
    failing: Vec<u8>,
}

/// Shared mock; clones see the same log and reply queues
#[derive(Clone, Default)]
pub struct MockBus {
    inner: Rc<RefCell<Inner>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes returned by the next read from `address`
    pub fn reply(&self, address: u8, bytes: &[u8]) {
        self.inner
            .borrow_mut()
            .replies
            .entry(address)
            .or_default()
            .push_back(bytes.to_vec());
    }

    /// Bytes returned once the queue for `address` is empty
    pub fn fallback(&self, address: u8, bytes: &[u8]) {
        self.inner
            .borrow_mut()
            .fallback
            .insert(address, bytes.to_vec());
    }

    /// Every call to `address` fails from now on
    pub fn fail(&self, address: u8) {
        self.inner.borrow_mut().failing.push(address);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.inner.borrow().ops.clone()
    }

    /// Payloads written to `address` with [`RegisterBus::write`]
    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Write(a, bytes) if a == address => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.inner.borrow_mut().ops.clear();
    }

    fn record(&self, address: u8, op: Op) -> Result<(), Nack> {
        let mut inner = self.inner.borrow_mut();
        inner.ops.push(op);
        if inner.failing.contains(&address) {
            Err(Nack)
        } else {
            Ok(())
        }
    }

    fn next_reply(&self, address: u8, buf: &mut [u8]) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let reply = inner
            .replies
            .get_mut(&address)
            .and_then(|queue| queue.pop_front())
            .or_else(|| inner.fallback.get(&address).cloned())
            .unwrap_or_default();
        buf.fill(0);
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
    }
}

impl RegisterBus for MockBus {
    type Error = Nack;

    fn write_register(&mut self, address: u8, reg: u8, value: u8) -> Result<(), Nack> {
        self.record(address, Op::WriteRegister(address, reg, value))
    }

    fn read_register(&mut self, address: u8, reg: u8) -> Result<u8, Nack> {
        self.record(address, Op::ReadRegister(address, reg))?;
        let mut byte = [0u8];
        self.next_reply(address, &mut byte);
        Ok(byte[0])
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Nack> {
        self.record(address, Op::Write(address, bytes.to_vec()))
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Nack> {
        self.record(address, Op::Read(address, buf.len()))?;
        self.next_reply(address, buf);
        Ok(())
    }
}

/// Delay that only adds up the requested time
#[derive(Clone, Default)]
pub struct MockDelay {
    pub elapsed_ms: Rc<RefCell<u32>>,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.elapsed_ms.borrow_mut() += ns / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        *self.elapsed_ms.borrow_mut() += ms;
    }
}
