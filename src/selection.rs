//! Category, brand and model selection leading up to a comparison.
//!
//! The cascade is category → (brand, brand) → (model, model). Each side
//! loads its own model list. Every selection that triggers a fetch hands out a
//! [`Ticket`]; the response is only applied while the ticket is current, so a
//! slow answer for an earlier selection can never overwrite newer state.

use eyre::{bail, Result, WrapErr};
use tracing::{debug, warn};

use crate::{
    compare::{compare, ComparisonTable},
    product::{Definitions, Product},
};

/// Shown when compare is requested before both models are chosen.
pub const INCOMPLETE_SELECTION: &str = "Please select both products for comparison.";
/// Shown when either product of a comparison could not be fetched.
pub const FETCH_FAILED: &str = "Product data could not be fetched. Please try again.";

/// Where the selection flow gets its data from.
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    async fn brands(&self, category: &str) -> Result<Vec<String>>;
    async fn models(&self, category: &str, brand: &str) -> Result<Vec<String>>;
    async fn product_details(&self, category: &str, brand: &str, model: &str) -> Result<Product>;
    async fn definitions(&self, category: &str) -> Result<Definitions>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One of the two products being compared.
pub enum Side {
    First,
    Second,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Brands,
    Models(Side),
}

/// Proof that a fetch was started by a particular selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Ticket {
    slot: Slot,
    generation: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Which controls are shown or enabled.
pub struct Controls {
    pub brands_visible: bool,
    pub models_visible: [bool; 2],
    pub compare_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub brand: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything needed to fetch the two products of a comparison.
pub struct ComparisonRequest {
    pub category: String,
    pub first: ProductRef,
    pub second: ProductRef,
}

#[derive(Debug, Default)]
struct SideState {
    brand: Option<String>,
    models: Option<Vec<String>>,
    model: Option<String>,
    generation: u64,
}

impl SideState {
    /// Forgets the brand and everything below it. Pending model lists are
    /// invalidated.
    fn reset(&mut self) {
        self.brand = None;
        self.models = None;
        self.model = None;
        self.generation += 1;
    }
}

#[derive(Debug, Default)]
pub struct SelectionController {
    category: Option<String>,
    brands: Option<Vec<String>>,
    generation: u64,
    sides: [SideState; 2],
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Brands of the selected category, once loaded.
    pub fn brands(&self) -> Option<&[String]> {
        self.brands.as_deref()
    }

    pub fn brand(&self, side: Side) -> Option<&str> {
        self.sides[side.index()].brand.as_deref()
    }

    /// Models of the brand selected on `side`, once loaded.
    pub fn models(&self, side: Side) -> Option<&[String]> {
        self.sides[side.index()].models.as_deref()
    }

    pub fn model(&self, side: Side) -> Option<&str> {
        self.sides[side.index()].model.as_deref()
    }

    /// Selects `category`, clearing every selection below it.
    ///
    /// Returns the ticket for the brand fetch, or `None` when the category is
    /// already selected and nothing needs to be fetched.
    pub fn begin_category(&mut self, category: &str) -> Option<Ticket> {
        if self.category.as_deref() == Some(category) {
            return None;
        }

        self.category = Some(category.to_string());
        self.brands = None;
        self.sides.iter_mut().for_each(SideState::reset);
        self.generation += 1;

        Some(Ticket {
            slot: Slot::Brands,
            generation: self.generation,
        })
    }

    /// Stores fetched brands. Returns false if `ticket` is stale.
    pub fn apply_brands(&mut self, ticket: Ticket, brands: Vec<String>) -> bool {
        if ticket.slot != Slot::Brands || ticket.generation != self.generation {
            debug!("Discarding stale brand list");
            return false;
        }
        self.brands = Some(brands);
        true
    }

    /// Selects `brand` on `side`, clearing that side's model.
    ///
    /// Returns the ticket for the model fetch, or `None` when no category is
    /// selected or the brand is already selected.
    pub fn begin_brand(&mut self, side: Side, brand: &str) -> Option<Ticket> {
        self.category.as_ref()?;
        let state = &mut self.sides[side.index()];
        if state.brand.as_deref() == Some(brand) {
            return None;
        }

        state.reset();
        state.brand = Some(brand.to_string());

        Some(Ticket {
            slot: Slot::Models(side),
            generation: state.generation,
        })
    }

    /// Stores fetched models. Returns false if `ticket` is stale.
    pub fn apply_models(&mut self, ticket: Ticket, models: Vec<String>) -> bool {
        let Slot::Models(side) = ticket.slot else {
            return false;
        };
        let state = &mut self.sides[side.index()];
        if ticket.generation != state.generation {
            debug!("Discarding stale model list for {side:?}");
            return false;
        }
        state.models = Some(models);
        true
    }

    /// Selects `model` on `side`. An empty string clears the selection.
    pub fn select_model(&mut self, side: Side, model: &str) -> Result<()> {
        let state = &mut self.sides[side.index()];
        if model.is_empty() {
            state.model = None;
            return Ok(());
        }

        let known = state
            .models
            .as_ref()
            .is_some_and(|models| models.iter().any(|m| m == model));
        if !known {
            bail!("{model} is not one of the loaded models");
        }
        state.model = Some(model.to_string());
        Ok(())
    }

    pub fn controls(&self) -> Controls {
        Controls {
            brands_visible: self.brands.is_some(),
            models_visible: Side::BOTH.map(|side| self.sides[side.index()].models.is_some()),
            compare_enabled: self.sides.iter().all(|state| state.model.is_some()),
        }
    }

    /// The two products to compare, or an error when either is unset.
    pub fn comparison_request(&self) -> Result<ComparisonRequest> {
        let product = |side: Side| {
            let state = &self.sides[side.index()];
            Some(ProductRef {
                brand: state.brand.clone()?,
                model: state.model.clone()?,
            })
        };

        match (&self.category, product(Side::First), product(Side::Second)) {
            (Some(category), Some(first), Some(second)) => Ok(ComparisonRequest {
                category: category.clone(),
                first,
                second,
            }),
            _ => bail!(INCOMPLETE_SELECTION),
        }
    }

    /// Selects `category` and loads its brands.
    ///
    /// A failed fetch is logged and leaves the brand list unloaded.
    pub async fn select_category<S: CatalogSource>(&mut self, source: &S, category: &str) {
        let Some(ticket) = self.begin_category(category) else {
            return;
        };
        match source.brands(category).await {
            Ok(brands) => {
                self.apply_brands(ticket, brands);
            }
            Err(e) => warn!("Failed to load brands of {category}: {e:#}"),
        }
    }

    /// Selects `brand` on `side` and loads its models.
    ///
    /// A failed fetch is logged and leaves the model list unloaded.
    pub async fn select_brand<S: CatalogSource>(&mut self, source: &S, side: Side, brand: &str) {
        let Some(ticket) = self.begin_brand(side, brand) else {
            return;
        };
        let Some(category) = self.category.clone() else {
            return;
        };
        match source.models(&category, brand).await {
            Ok(models) => {
                self.apply_models(ticket, models);
            }
            Err(e) => warn!("Failed to load models of {brand}: {e:#}"),
        }
    }

    /// Fetches both selected products concurrently and renders them side by
    /// side. Nothing is fetched unless both products are selected.
    pub async fn compare<S: CatalogSource>(&self, source: &S) -> Result<ComparisonTable> {
        let request = self.comparison_request()?;
        let ComparisonRequest {
            category,
            first,
            second,
        } = &request;

        let (product1, product2) = tokio::try_join!(
            source.product_details(category, &first.brand, &first.model),
            source.product_details(category, &second.brand, &second.model),
        )
        .wrap_err(FETCH_FAILED)?;

        let definitions = source.definitions(category).await.unwrap_or_else(|e| {
            warn!("Failed to load definitions of {category}: {e:#}");
            Definitions::default()
        });

        Ok(compare(category, &product1, &product2, &definitions))
    }
}
