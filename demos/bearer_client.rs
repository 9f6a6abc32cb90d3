//! Demonstrates guarding reqwest calls with a credential store whose issuer is a local mock
//! endpoint, so every outbound request carries a fresh bearer token.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
// self
use token_keeper::{
	client::InterceptingClient,
	config::StoreConfig,
	credential::Credential,
	error::IssueError,
	http::ReqwestTransport,
	issuer::issuer_fn,
	store::CredentialStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let places_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/places").header("authorization", "Bearer demo-token");
			then.status(200).header("content-type", "application/json").body("[\"berlin\"]");
		})
		.await;
	let store = CredentialStore::with_config(
		issuer_fn(|| async {
			Credential::builder("demo-region")
				.token("demo-token")
				.expires_in(Duration::minutes(15))
				.build()
				.map_err(IssueError::from)
		}),
		StoreConfig::default().with_refresh_buffer(Duration::seconds(90)),
	);
	let client = <InterceptingClient<ReqwestTransport, _>>::new(ReqwestTransport::default(), store);

	client.store().initialize().await?;

	let request = client.transport().get(server.url("/places")).build()?;
	let response = client.send(request).await?;

	println!("Status: {}.", response.status());
	println!("Body: {}.", response.text().await?);
	println!("Credential expires at: {:?}.", client.store().expires_at());

	places_mock.assert_async().await;

	Ok(())
}
