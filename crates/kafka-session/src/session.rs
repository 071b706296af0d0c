use crate::consumer::{ConsumerSession, FetchTuning};
use crate::each::Each;
use crate::error::{Error, Result};
use crate::producer::ProducerSession;
use crate::tuple::Tuple;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// What a session is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => write!(f, "producer"),
            Role::Consumer => write!(f, "consumer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Publish,
    Fetch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Publish => write!(f, "publish"),
            Operation::Fetch => write!(f, "fetch"),
        }
    }
}

/// A connection in one of the two roles.
///
/// Calling an operation the role does not support fails with
/// [`Error::Capability`] instead of reaching the broker.
#[derive(Debug)]
pub enum Session {
    Producer(ProducerSession),
    Consumer(ConsumerSession),
}

impl From<ProducerSession> for Session {
    fn from(session: ProducerSession) -> Self {
        Session::Producer(session)
    }
}

impl From<ConsumerSession> for Session {
    fn from(session: ConsumerSession) -> Self {
        Session::Consumer(session)
    }
}

impl Session {
    pub fn role(&self) -> Role {
        match self {
            Session::Producer(_) => Role::Producer,
            Session::Consumer(_) => Role::Consumer,
        }
    }

    pub fn publish(&mut self, tuples: Vec<Tuple>) -> Result<Vec<Tuple>> {
        match self {
            Session::Producer(producer) => producer.publish(tuples),
            Session::Consumer(_) => Err(Error::capability(Role::Consumer, Operation::Publish)),
        }
    }

    pub fn fetch(&mut self) -> Result<Vec<Tuple>> {
        match self {
            Session::Consumer(consumer) => consumer.fetch(),
            Session::Producer(_) => Err(Error::capability(Role::Producer, Operation::Fetch)),
        }
    }

    /// Retune a consumer in place. Producers have nothing to retune.
    pub fn retune(&mut self, tuning: &FetchTuning) -> Result<bool> {
        match self {
            Session::Consumer(consumer) => consumer.retune(tuning),
            Session::Producer(_) => Ok(false),
        }
    }

    /// Offset of the next record a consumer fetches.
    pub fn position(&self) -> Option<i64> {
        match self {
            Session::Consumer(consumer) => Some(consumer.position()),
            Session::Producer(_) => None,
        }
    }

    pub fn close(&mut self) {
        match self {
            Session::Producer(producer) => producer.close(),
            Session::Consumer(consumer) => consumer.close(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Session::Producer(producer) => producer.is_closed(),
            Session::Consumer(consumer) => consumer.is_closed(),
        }
    }
}

/// A session shared between the gateway and the datasets built on it.
///
/// Every operation takes the lock for its whole duration, so a producer
/// session can be used from several datasets without interleaving batches.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
    role: Role,
}

impl SharedSession {
    pub fn new(session: impl Into<Session>) -> Self {
        let session = session.into();
        let role = session.role();
        Self {
            inner: Arc::new(Mutex::new(session)),
            role,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        self.inner.lock().map_err(|_| Error::Poisoned)
    }

    pub fn publish(&self, tuples: Vec<Tuple>) -> Result<Vec<Tuple>> {
        self.lock()?.publish(tuples)
    }

    pub fn fetch(&self) -> Result<Vec<Tuple>> {
        self.lock()?.fetch()
    }

    /// Lazy iteration over this session's fetches.
    ///
    /// Role and closed state are checked up front; a producer session fails
    /// here rather than on the first `next`.
    pub fn each(&self) -> Result<Each<impl FnMut() -> Result<Vec<Tuple>> + '_>> {
        if self.role != Role::Consumer {
            return Err(Error::capability(self.role, Operation::Fetch));
        }
        if self.is_closed()? {
            return Err(Error::SessionClosed);
        }
        Ok(Each::new(move || self.fetch()))
    }

    pub fn retune(&self, tuning: &FetchTuning) -> Result<bool> {
        self.lock()?.retune(tuning)
    }

    pub fn position(&self) -> Result<Option<i64>> {
        Ok(self.lock()?.position())
    }

    pub fn close(&self) -> Result<()> {
        self.lock()?.close();
        Ok(())
    }

    pub fn is_closed(&self) -> Result<bool> {
        Ok(self.lock()?.is_closed())
    }

    /// Whether both handles point at the same connection.
    pub fn ptr_eq(&self, other: &SharedSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSession")
            .field("role", &self.role)
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}
