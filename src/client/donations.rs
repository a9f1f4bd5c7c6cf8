//! Donation service.

use super::{ApiClient, ClientError};
use crate::models::{
    CreateDonationRequest, DeleteResult, Donation, DonationListQuery, DonationPage,
    UpdateDonationRequest,
};

/// Calls the donation endpoints.
#[derive(Debug, Clone)]
pub struct DonationService {
    client: ApiClient,
}

impl DonationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All donations from a contact (first page at the default size).
    pub async fn fetch_contact_donations(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Donation>, ClientError> {
        let page = self
            .fetch_contact_donations_page(contact_id, &DonationListQuery::default())
            .await?;
        tracing::debug!("Found {} donations for contact", page.donations.len());
        Ok(page.donations)
    }

    /// All donations from a business (first page at the default size).
    pub async fn fetch_business_donations(
        &self,
        business_id: &str,
    ) -> Result<Vec<Donation>, ClientError> {
        let page = self
            .fetch_business_donations_page(business_id, &DonationListQuery::default())
            .await?;
        tracing::debug!("Found {} donations for business", page.donations.len());
        Ok(page.donations)
    }

    pub async fn fetch_contact_donations_page(
        &self,
        contact_id: &str,
        query: &DonationListQuery,
    ) -> Result<DonationPage, ClientError> {
        let url = self
            .client
            .url(&format!("/api/contacts/{}/donations", contact_id));
        self.client
            .send(self.client.http().get(url).query(query), "fetch donations")
            .await
    }

    pub async fn fetch_business_donations_page(
        &self,
        business_id: &str,
        query: &DonationListQuery,
    ) -> Result<DonationPage, ClientError> {
        let url = self
            .client
            .url(&format!("/api/businesses/{}/donations", business_id));
        self.client
            .send(self.client.http().get(url).query(query), "fetch donations")
            .await
    }

    /// One page of the current workspace's donations.
    pub async fn fetch_donations(
        &self,
        query: &DonationListQuery,
    ) -> Result<DonationPage, ClientError> {
        let url = self.client.url("/api/donations");
        self.client
            .send(self.client.http().get(url).query(query), "fetch donations")
            .await
    }

    pub async fn create_contact_donation(
        &self,
        contact_id: &str,
        request: &CreateDonationRequest,
    ) -> Result<Donation, ClientError> {
        let url = self
            .client
            .url(&format!("/api/contacts/{}/donations", contact_id));
        self.client
            .send(self.client.http().post(url).json(request), "create donation")
            .await
    }

    pub async fn create_business_donation(
        &self,
        business_id: &str,
        request: &CreateDonationRequest,
    ) -> Result<Donation, ClientError> {
        let url = self
            .client
            .url(&format!("/api/businesses/{}/donations", business_id));
        self.client
            .send(self.client.http().post(url).json(request), "create donation")
            .await
    }

    /// Older two-field form of [`Self::create_contact_donation`].
    pub async fn create_donation(
        &self,
        contact_id: &str,
        amount: f64,
        status: &str,
    ) -> Result<Donation, ClientError> {
        let request = CreateDonationRequest {
            amount,
            status: status.to_string(),
            notes: None,
            payment_type: None,
        };
        self.create_contact_donation(contact_id, &request).await
    }

    pub async fn update_donation(
        &self,
        donation_id: &str,
        request: &UpdateDonationRequest,
    ) -> Result<Donation, ClientError> {
        let url = self.client.url(&format!("/api/donations/{}", donation_id));
        self.client
            .send(self.client.http().put(url).json(request), "update donation")
            .await
    }

    /// Returns the server's `success` flag.
    pub async fn delete_donation(&self, donation_id: &str) -> Result<bool, ClientError> {
        let url = self.client.url(&format!("/api/donations/{}", donation_id));
        let result: DeleteResult = self
            .client
            .send(self.client.http().delete(url), "delete donation")
            .await?;
        Ok(result.success)
    }
}
