//! A page: several independent systems reduced side by side.
//!
//! Systems share nothing mutable, so with the `parallel` feature each one is
//! reduced on its own rayon worker. Results come back in system order either
//! way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::ReductionConfig;
use crate::model::{Scale, SystemId};
use crate::reduction::{self, CancelToken, ReductionReport};
use crate::sig::Sig;
use crate::{Error, Result};

/// All systems of one sheet.
#[derive(Debug, Clone)]
pub struct Page {
    scale: Scale,
    systems: Vec<Sig>,
}

impl Page {
    pub fn new(scale: Scale) -> Self {
        Self { scale, systems: Vec::new() }
    }

    /// Open a new, empty system and return its graph.
    pub fn add_system(&mut self) -> &mut Sig {
        let next = self.systems.iter().map(|s| s.system().0 + 1).max().unwrap_or(0);
        let id = SystemId(next);
        self.systems.push(Sig::new(id, self.scale));
        let last = self.systems.len() - 1;
        &mut self.systems[last]
    }

    /// Adopt a graph built elsewhere. Its system id must be unused.
    pub fn push_system(&mut self, sig: Sig) -> Result<()> {
        if self.system(sig.system()).is_some() {
            return Err(Error::InvalidConfig(format!("system {} already on page", sig.system())));
        }
        self.systems.push(sig);
        Ok(())
    }

    pub fn system(&self, id: SystemId) -> Option<&Sig> {
        self.systems.iter().find(|s| s.system() == id)
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut Sig> {
        self.systems.iter_mut().find(|s| s.system() == id)
    }

    pub fn systems(&self) -> &[Sig] {
        &self.systems
    }

    /// Reduce every system. One failing system does not stop the others.
    pub fn reduce_all(&mut self, config: &ReductionConfig) -> Vec<Result<ReductionReport>> {
        self.reduce_each(|sig| reduction::reduce(sig, config))
    }

    pub fn reduce_all_with_cancel(
        &mut self,
        config: &ReductionConfig,
        token: &CancelToken,
    ) -> Vec<Result<ReductionReport>> {
        self.reduce_each(|sig| reduction::reduce_with_cancel(sig, config, token))
    }

    #[cfg(feature = "parallel")]
    fn reduce_each<F>(&mut self, f: F) -> Vec<Result<ReductionReport>>
    where
        F: Fn(&mut Sig) -> Result<ReductionReport> + Sync + Send,
    {
        self.systems.par_iter_mut().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn reduce_each<F>(&mut self, f: F) -> Vec<Result<ReductionReport>>
    where
        F: Fn(&mut Sig) -> Result<ReductionReport>,
    {
        self.systems.iter_mut().map(f).collect()
    }
}
