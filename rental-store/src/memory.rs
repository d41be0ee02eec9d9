use async_trait::async_trait;
use rental_catalog::{sort_tariffs, NewPrice, Price, Product};
use rental_core::repository::{
    CompanyRepository, OfferRepository, OfferUpdate, ProductRepository, ReservationChange, ReservationRepository,
};
use rental_core::{
    Company, CompanyWithPoints, CoreError, CoreResult, NewCompany, NewRentalPoint, RentalPoint, RentalPointSummary,
};
use rental_offer::{
    general_rating, BoardOffer, NewOffer, NewRating, Offer, OfferDetail, OfferFilter, OfferLabels, OfferPatch, Rating,
};
use rental_reservation::{lifecycle, NewReservation, Reservation, StatusUpdate};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    companies: HashMap<Uuid, Company>,
    rental_points: HashMap<Uuid, RentalPoint>,
    products: HashMap<Uuid, Product>,
    offers: HashMap<Uuid, Offer>,
    prices: Vec<Price>,
    ratings: Vec<Rating>,
    reservations: HashMap<Uuid, Reservation>,
}

impl State {
    fn require_offer(&self, id: Uuid) -> CoreResult<&Offer> {
        self.offers.get(&id).ok_or_else(|| CoreError::not_found("offer", id))
    }

    fn check_offer_refs(&self, rental_point_id: Uuid, product_id: Option<Uuid>) -> CoreResult<()> {
        if !self.rental_points.contains_key(&rental_point_id) {
            return Err(CoreError::not_found("rental point", rental_point_id));
        }
        if let Some(product_id) = product_id {
            if !self.products.contains_key(&product_id) {
                return Err(CoreError::not_found("product", product_id));
            }
        }
        Ok(())
    }

    fn company_with_points(&self, company: &Company) -> CompanyWithPoints {
        let mut rental_points: Vec<RentalPoint> = self
            .rental_points
            .values()
            .filter(|p| p.company_id == company.id)
            .cloned()
            .collect();
        rental_points.sort_by(|a, b| a.address.address.cmp(&b.address.address));

        CompanyWithPoints { company: company.clone(), rental_points }
    }

    fn point_summary(&self, point: &RentalPoint) -> RentalPointSummary {
        let marks = self.ratings.iter().filter_map(|r| {
            self.offers
                .get(&r.offer_id)
                .filter(|o| o.rental_point_id == point.id)
                .map(|_| r.mark)
        });

        RentalPointSummary { point: point.clone(), general_rating: general_rating(marks) }
    }

    fn offer_detail(&self, offer: &Offer) -> OfferDetail {
        let product = offer.product_id.and_then(|id| self.products.get(&id));

        let mut prices: Vec<Price> = self.prices.iter().filter(|p| p.offer_id == offer.id).cloned().collect();
        sort_tariffs(&mut prices);
        let ratings: Vec<Rating> = self.ratings.iter().filter(|r| r.offer_id == offer.id).cloned().collect();

        OfferDetail {
            offer: offer.clone(),
            product: product.map(|p| p.name.clone()),
            category: product.and_then(|p| p.category.clone()),
            general_rating: general_rating(ratings.iter().map(|r| r.mark)),
            prices,
            ratings,
        }
    }

    fn labels(&self, offer: &Offer) -> OfferLabels<'_> {
        let point = self.rental_points.get(&offer.rental_point_id);
        OfferLabels {
            category: offer
                .product_id
                .and_then(|id| self.products.get(&id))
                .and_then(|p| p.category.as_deref()),
            city: point.and_then(|p| p.address.city.as_deref()),
            company: point
                .and_then(|p| self.companies.get(&p.company_id))
                .map(|c| c.name.as_str()),
        }
    }

    /// Offers newest first, ties broken by id.
    fn sorted_offers<'a>(&'a self, keep: impl Fn(&Offer) -> bool) -> Vec<&'a Offer> {
        let mut offers: Vec<&Offer> = self.offers.values().filter(|o| keep(*o)).collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        offers
    }
}

fn newest_first(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    reservations
}

/// Process-local store behind a single mutex. Every operation, including a
/// reservation transition and its stock adjustment, runs under that lock.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Products are reference data with no write API.
    pub async fn seed_product(&self, product: Product) -> Product {
        let mut state = self.state.lock().await;
        state.products.insert(product.id, product.clone());
        product
    }
}

#[async_trait]
impl CompanyRepository for InMemoryStore {
    async fn create_company(&self, user_id: Uuid, company: NewCompany) -> CoreResult<Company> {
        company.validate()?;
        let mut state = self.state.lock().await;

        if state.companies.values().any(|c| c.user_id == user_id) {
            return Err(CoreError::Conflict("user already owns a company".into()));
        }

        let company = company.into_company(user_id);
        state.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn get_company(&self, id: Uuid) -> CoreResult<Option<CompanyWithPoints>> {
        let state = self.state.lock().await;
        Ok(state.companies.get(&id).map(|c| state.company_with_points(c)))
    }

    async fn company_for_user(&self, user_id: Uuid) -> CoreResult<Option<CompanyWithPoints>> {
        let state = self.state.lock().await;
        Ok(state
            .companies
            .values()
            .find(|c| c.user_id == user_id)
            .map(|c| state.company_with_points(c)))
    }

    async fn list_companies(&self) -> CoreResult<Vec<CompanyWithPoints>> {
        let state = self.state.lock().await;
        let mut companies: Vec<CompanyWithPoints> =
            state.companies.values().map(|c| state.company_with_points(c)).collect();
        companies.sort_by(|a, b| a.company.name.cmp(&b.company.name));
        Ok(companies)
    }

    async fn create_rental_point(&self, company_id: Uuid, point: NewRentalPoint) -> CoreResult<RentalPoint> {
        point.validate()?;
        let mut state = self.state.lock().await;

        if !state.companies.contains_key(&company_id) {
            return Err(CoreError::not_found("company", company_id));
        }

        let point = point.into_rental_point(company_id);
        state.rental_points.insert(point.id, point.clone());
        Ok(point)
    }

    async fn list_rental_points(&self, company_id: Option<Uuid>) -> CoreResult<Vec<RentalPointSummary>> {
        let state = self.state.lock().await;
        let mut points: Vec<RentalPointSummary> = state
            .rental_points
            .values()
            .filter(|p| company_id.map_or(true, |id| p.company_id == id))
            .map(|p| state.point_summary(p))
            .collect();
        points.sort_by(|a, b| a.point.address.address.cmp(&b.point.address.address));
        Ok(points)
    }

    async fn get_rental_point(&self, id: Uuid) -> CoreResult<Option<RentalPointSummary>> {
        let state = self.state.lock().await;
        Ok(state.rental_points.get(&id).map(|p| state.point_summary(p)))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list_products(&self) -> CoreResult<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> CoreResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl OfferRepository for InMemoryStore {
    async fn create_offer(&self, offer: NewOffer) -> CoreResult<Offer> {
        offer.validate()?;
        let mut state = self.state.lock().await;
        state.check_offer_refs(offer.rental_point_id, offer.product_id)?;

        let offer = offer.into_offer();
        state.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    async fn update_offer(&self, id: Uuid, patch: OfferPatch) -> CoreResult<OfferUpdate> {
        patch.validate()?;
        let mut state = self.state.lock().await;

        let mut offer = state.require_offer(id)?.clone();
        let previous_count = offer.count;
        patch.apply(&mut offer);
        state.check_offer_refs(offer.rental_point_id, offer.product_id)?;

        state.offers.insert(id, offer.clone());
        Ok(OfferUpdate { offer, previous_count })
    }

    async fn delete_offer(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.offers.remove(&id).is_none() {
            return Err(CoreError::not_found("offer", id));
        }

        state.prices.retain(|p| p.offer_id != id);
        state.ratings.retain(|r| r.offer_id != id);
        state.reservations.retain(|_, r| r.offer_id != id);
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> CoreResult<Option<OfferDetail>> {
        let state = self.state.lock().await;
        Ok(state.offers.get(&id).map(|o| state.offer_detail(o)))
    }

    async fn list_offers(&self, filter: &OfferFilter) -> CoreResult<Vec<OfferDetail>> {
        let state = self.state.lock().await;
        Ok(state
            .sorted_offers(|o| filter.matches(&state.labels(o)))
            .into_iter()
            .map(|o| state.offer_detail(o))
            .collect())
    }

    async fn list_rental_point_offers(&self, rental_point_id: Uuid) -> CoreResult<Vec<OfferDetail>> {
        let state = self.state.lock().await;
        Ok(state
            .sorted_offers(|o| o.rental_point_id == rental_point_id)
            .into_iter()
            .map(|o| state.offer_detail(o))
            .collect())
    }

    async fn board_offers(&self) -> CoreResult<Vec<BoardOffer>> {
        let state = self.state.lock().await;
        Ok(state
            .sorted_offers(|o| o.is_active)
            .into_iter()
            .map(|o| {
                let address = state
                    .rental_points
                    .get(&o.rental_point_id)
                    .map(|p| p.address.to_string())
                    .unwrap_or_default();
                BoardOffer::new(o, address)
            })
            .collect())
    }

    async fn add_price(&self, offer_id: Uuid, price: NewPrice) -> CoreResult<Price> {
        price.validate()?;
        let mut state = self.state.lock().await;
        state.require_offer(offer_id)?;

        let price = price.into_price(offer_id);
        state.prices.push(price.clone());
        Ok(price)
    }

    async fn list_prices(&self, offer_id: Uuid) -> CoreResult<Vec<Price>> {
        let state = self.state.lock().await;
        Ok(state.offer_detail(state.require_offer(offer_id)?).prices)
    }

    async fn add_rating(&self, offer_id: Uuid, user_id: Uuid, rating: NewRating) -> CoreResult<Rating> {
        rating.validate()?;
        let mut state = self.state.lock().await;
        state.require_offer(offer_id)?;

        let rating = rating.into_rating(offer_id, user_id);
        state.ratings.push(rating.clone());
        Ok(rating)
    }

    async fn list_ratings(&self, offer_id: Uuid) -> CoreResult<Vec<Rating>> {
        let state = self.state.lock().await;
        state.require_offer(offer_id)?;
        Ok(state.ratings.iter().filter(|r| r.offer_id == offer_id).cloned().collect())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn create_reservation(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        reservation: NewReservation,
    ) -> CoreResult<Reservation> {
        reservation.validate()?;
        let mut state = self.state.lock().await;
        state.require_offer(offer_id)?;

        let reservation = reservation.into_reservation(offer_id, user_id);
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        Ok(self.state.lock().await.reservations.get(&id).cloned())
    }

    async fn list_offer_reservations(&self, offer_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let state = self.state.lock().await;
        Ok(newest_first(
            state.reservations.values().filter(|r| r.offer_id == offer_id).cloned().collect(),
        ))
    }

    async fn list_rental_point_reservations(&self, rental_point_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let state = self.state.lock().await;
        Ok(newest_first(
            state
                .reservations
                .values()
                .filter(|r| {
                    state
                        .offers
                        .get(&r.offer_id)
                        .is_some_and(|o| o.rental_point_id == rental_point_id)
                })
                .cloned()
                .collect(),
        ))
    }

    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> CoreResult<ReservationChange> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let reservation = state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("reservation", id))?;
        let offer = state
            .offers
            .get_mut(&reservation.offer_id)
            .ok_or_else(|| CoreError::not_found("offer", reservation.offer_id))?;

        // `apply` writes both or neither.
        let transition = lifecycle::apply(reservation, &mut offer.count, &update)?;

        Ok(ReservationChange { reservation: reservation.clone(), transition })
    }
}
