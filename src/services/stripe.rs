use reqwest::Client;

pub struct StripeService;

impl StripeService {
    fn secret_key() -> Result<String, String> {
        crate::config::Config::stripe_secret_key()
            .ok_or_else(|| "Stripe is not configured".to_string())
    }

    /// Create a Checkout session for one tour seat. The tour id travels in
    /// `client_reference_id` so the payment can be tied back to a booking.
    pub async fn create_checkout_session(
        tour_id: &str,
        tour_name: &str,
        tour_summary: &str,
        price: f64,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<serde_json::Value, String> {
        let client = Client::new();

        let amount_cents = (price * 100.0).round() as i64;
        let params = [
            ("mode", "payment".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("customer_email", customer_email.to_string()),
            ("client_reference_id", tour_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                format!("{} Tour", tour_name),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                tour_summary.to_string(),
            ),
        ];

        let res = client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(Self::secret_key()?, None::<String>)
            .form(&params)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        res.json().await.map_err(|e| e.to_string())
    }
}
