//! Call-recording model with scripted fit outputs (test support).
//!
//! The scheduler and cascade tests need to pin down the *exact* call
//! sequence and to dictate each fit's return value; this model records every
//! trait call and replays a scripted list of fit outcomes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::backend::LikelihoodModel;
use crate::domain::Optimizer;
use crate::error::{CascadeError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FreezeAll,
    Thaw(usize),
    Fit { optimizer: Optimizer, covariance: bool },
    Delete(String),
    Serialize(PathBuf),
}

pub struct ScriptedModel {
    /// (source name, parameter count) in layout order.
    sources: Vec<(String, usize)>,
    /// Outcomes replayed by successive `fit` calls.
    fit_outcomes: VecDeque<Result<f64>>,
    pub calls: RefCell<Vec<Call>>,
}

impl ScriptedModel {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        ScriptedModel {
            sources: sources.into_iter().map(|(n, c)| (n.into(), c)).collect(),
            fit_outcomes: VecDeque::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Queue the next fit outcomes, in order.
    pub fn script_fits<I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = Result<f64>>,
    {
        self.fit_outcomes.extend(outcomes);
    }

    /// The optimizer/covariance pairs of all fit calls so far.
    pub fn fit_calls(&self) -> Vec<(Optimizer, bool)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Fit {
                    optimizer,
                    covariance,
                } => Some((*optimizer, *covariance)),
                _ => None,
            })
            .collect()
    }

    /// Indices thawed between consecutive `FreezeAll` calls, grouped per
    /// activation.
    pub fn activations(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        for call in self.calls.borrow().iter() {
            match call {
                Call::FreezeAll => out.push(Vec::new()),
                Call::Thaw(idx) => {
                    if let Some(last) = out.last_mut() {
                        last.push(*idx);
                    }
                }
                _ => {}
            }
        }
        out
    }
}

impl LikelihoodModel for ScriptedModel {
    fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|(n, _)| n.clone()).collect()
    }

    fn parameter_indices(&self, source: &str) -> Result<Vec<usize>> {
        let mut offset = 0;
        for (name, count) in &self.sources {
            if name == source {
                return Ok((offset..offset + count).collect());
            }
            offset += count;
        }
        Err(CascadeError::NotFound(source.to_string()))
    }

    fn freeze_all(&mut self) {
        self.calls.borrow_mut().push(Call::FreezeAll);
    }

    fn thaw(&mut self, param_index: usize) {
        self.calls.borrow_mut().push(Call::Thaw(param_index));
    }

    fn fit(&mut self, optimizer: Optimizer, covariance: bool) -> Result<f64> {
        self.calls.borrow_mut().push(Call::Fit {
            optimizer,
            covariance,
        });
        self.fit_outcomes
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted fit call #{}", self.calls.borrow().len()))
    }

    fn delete_source(&mut self, source: &str) -> Result<()> {
        self.calls.borrow_mut().push(Call::Delete(source.to_string()));
        match self.sources.iter().position(|(n, _)| n == source) {
            Some(idx) => {
                self.sources.remove(idx);
                Ok(())
            }
            None => Err(CascadeError::NotFound(source.to_string())),
        }
    }

    fn serialize(&self, dest: &Path) -> Result<()> {
        self.calls.borrow_mut().push(Call::Serialize(dest.to_path_buf()));
        Ok(())
    }
}
