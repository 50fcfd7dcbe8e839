//! Finite weighted multisets with decrementing stock.
//!
//! Used for limited enemy groups and scout packs: each draw takes one unit
//! of stock from the chosen entry, and exhausted entries drop out of the
//! pool. Forced entries (stock one) are never recycled; recurring entries
//! refill from their template stock once everything else is spent.

use serde::{Deserialize, Serialize};

use super::Generator;

/// One weighted entry with remaining stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry<T> {
    pub weight: f64,
    pub remaining: u32,
    pub item: T,
}

impl<T> FrequencyEntry<T> {
    pub fn new(weight: f64, remaining: u32, item: T) -> Self {
        Self {
            weight,
            remaining,
            item,
        }
    }
}

/// Weighted multiset. Forced entries are drained before recurring entries
/// are considered, and only recurring entries are ever refilled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPool<T> {
    forced: Vec<FrequencyEntry<T>>,
    recurring: Vec<FrequencyEntry<T>>,
    template: Vec<FrequencyEntry<T>>,
    refills: u32,
}

impl<T> Default for FrequencyPool<T> {
    fn default() -> Self {
        Self {
            forced: Vec::new(),
            recurring: Vec::new(),
            template: Vec::new(),
            refills: 0,
        }
    }
}

impl<T: Clone> FrequencyPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry that must be drawn exactly once before recurring entries
    pub fn with_forced(mut self, weight: f64, item: T) -> Self {
        self.forced.push(FrequencyEntry::new(weight, 1, item));
        self
    }

    /// Add an entry that refills to `stock` whenever the pool runs dry
    pub fn with_recurring(mut self, weight: f64, stock: u32, item: T) -> Self {
        let entry = FrequencyEntry::new(weight, stock, item);
        if stock > 0 {
            self.template.push(entry.clone());
            self.recurring.push(entry);
        }
        self
    }

    pub fn forced_remaining(&self) -> usize {
        self.forced.len()
    }

    pub fn recurring_remaining(&self) -> u32 {
        self.recurring.iter().map(|e| e.remaining).sum()
    }

    /// How many times the recurring entries have been refilled
    pub fn refills(&self) -> u32 {
        self.refills
    }

    pub fn is_empty(&self) -> bool {
        self.forced.is_empty() && self.recurring.is_empty() && self.template.is_empty()
    }

    /// Weighted draw. Forced entries go first; once they are gone recurring
    /// entries are drawn, refilling from the template when exhausted.
    /// Returns `None` only when the pool holds nothing at all.
    pub fn draw(&mut self, rng: &mut Generator) -> Option<T> {
        self.draw_where(rng, |_| true)
    }

    /// Weighted draw restricted to items `accept` allows. Rejected entries
    /// keep their stock. Forced entries that pass go first; recurring
    /// entries refill only after every forced entry is gone and no accepted
    /// recurring stock is left.
    pub fn draw_where<F>(&mut self, rng: &mut Generator, accept: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        if let Some(item) = draw_matching(&mut self.forced, rng, &accept) {
            return Some(item);
        }
        if let Some(item) = draw_matching(&mut self.recurring, rng, &accept) {
            return Some(item);
        }
        if !self.forced.is_empty() || !self.template.iter().any(|e| e.weight > 0.0 && accept(&e.item)) {
            return None;
        }
        self.recurring = self.template.clone();
        self.refills += 1;
        draw_matching(&mut self.recurring, rng, &accept)
    }

    /// Whether [`draw_where`](Self::draw_where) could yield anything
    pub fn can_draw_where<F>(&self, accept: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let live = |entries: &[FrequencyEntry<T>]| {
            entries
                .iter()
                .any(|e| e.remaining > 0 && e.weight > 0.0 && accept(&e.item))
        };
        live(self.forced.as_slice())
            || live(self.recurring.as_slice())
            || (self.forced.is_empty() && live(self.template.as_slice()))
    }
}

/// Weighted draw with stock decrement over a plain entry list, dropping the
/// entry when its stock reaches zero. `None` on an empty list.
pub fn draw_from<T: Clone>(entries: &mut Vec<FrequencyEntry<T>>, rng: &mut Generator) -> Option<T> {
    draw_matching(entries, rng, &|_: &T| true)
}

fn draw_matching<T, F>(entries: &mut Vec<FrequencyEntry<T>>, rng: &mut Generator, accept: &F) -> Option<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    entries.retain(|e| e.remaining > 0);
    let weights: Vec<f64> = entries
        .iter()
        .map(|e| if accept(&e.item) { e.weight.max(0.0) } else { 0.0 })
        .collect();
    if !weights.iter().any(|w| *w > 0.0) {
        return None;
    }
    let index = rng.select_index(&weights)?;
    if weights[index] <= 0.0 {
        return None;
    }
    let entry = &mut entries[index];
    entry.remaining -= 1;
    let item = entry.item.clone();
    if entry.remaining == 0 {
        entries.remove(index);
    }
    Some(item)
}
