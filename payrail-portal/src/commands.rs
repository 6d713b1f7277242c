//! Portal commands.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::ValueEnum;
use payrail_core::checkout::{Checkout, CheckoutError, WalletCheckout};
use payrail_core::config::ChainConfig;
use payrail_core::entities::deposit_vaults::DepositVault;
use payrail_core::entities::subscriptions::Subscription;
use payrail_core::entities::SubscriptionStatus;
use payrail_sdk::client::CheckoutClient;
use payrail_sdk::objects::{DepositVaultResponse, SubscriptionResponse};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::store::RemoteStore;
use crate::wallet::{PortalWallet, WalletArgs};

const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Wallet,
    Vault,
}

pub struct Portal {
    client: CheckoutClient,
}

impl Portal {
    pub fn new(server: Url) -> Self {
        Self {
            client: CheckoutClient::new(server),
        }
    }

    fn checkout(&self, chain: &ChainConfig, wallet: PortalWallet) -> Checkout<RemoteStore, PortalWallet> {
        Checkout::new(
            RemoteStore::new(self.client.clone()),
            wallet,
            chain.token_decimals,
        )
    }

    pub async fn show_plan(&self, plan_id: i64) -> anyhow::Result<()> {
        let response = self
            .client
            .plan(plan_id)
            .await
            .with_context(|| format!("failed to load plan {plan_id}"))?;
        let plan = &response.plan;
        println!("{} by {}", plan.name, response.merchant_name);
        println!(
            "  {} {} every {} days",
            plan.price,
            plan.token_symbol,
            plan.interval.days()
        );
        println!("  token {} on chain {}", plan.token_address, plan.chain_id);
        if !plan.active {
            println!("  no longer accepting subscriptions");
        }
        Ok(())
    }

    pub async fn subscribe(
        &self,
        plan_id: i64,
        mode: Mode,
        wait: bool,
        yes: bool,
        chain: ChainConfig,
        wallet_args: &WalletArgs,
    ) -> anyhow::Result<()> {
        let wallet = PortalWallet::from_args(wallet_args, &chain)?;
        let has_wallet = wallet.is_configured(wallet_args);
        let can_sign = wallet.can_sign();
        let mut checkout = self.checkout(&chain, wallet);

        match mode {
            Mode::Wallet => {
                if !can_sign {
                    bail!("wallet mode needs --wallet-rpc or PAYRAIL_PRIVATE_KEY");
                }
                self.subscribe_from_wallet(&mut checkout, plan_id, yes)
                    .await?;
            }
            Mode::Vault => {
                if has_wallet {
                    checkout.connect_wallet().await?;
                }
                let result = match checkout.generate_vault(plan_id).await {
                    Ok(result) => result,
                    Err(CheckoutError::VaultNotRecorded {
                        subscription_id,
                        source,
                    }) => {
                        warn!(%subscription_id, error = %source, "Retrying vault write");
                        checkout.resume_vault(subscription_id).await?
                    }
                    Err(e) => return Err(e.into()),
                };
                let plan = self.client.plan(plan_id).await?.plan;
                println!(
                    "Send {} {} to {}",
                    plan.price, plan.token_symbol, result.vault.vault_address
                );
                print_subscription(&result.subscription, Some(&result.vault));

                if wait {
                    self.wait_for_activation(&mut checkout).await?;
                }
            }
        }
        Ok(())
    }

    /// The first orchestrator call only connects. The subscriber sees what
    /// will be paid from which account and confirms before anything is sent.
    async fn subscribe_from_wallet(
        &self,
        checkout: &mut Checkout<RemoteStore, PortalWallet>,
        plan_id: i64,
        yes: bool,
    ) -> anyhow::Result<()> {
        let address = match checkout.subscribe_with_wallet(plan_id).await? {
            WalletCheckout::Connected { address } => address,
            WalletCheckout::Activated(subscription) => {
                print_subscription(&subscription, None);
                return Ok(());
            }
        };
        info!(%address, "Wallet connected");

        let plan = self.client.plan(plan_id).await?.plan;
        println!(
            "{}: {} {} every {} days",
            plan.name,
            plan.price,
            plan.token_symbol,
            plan.interval.days()
        );
        println!("  paid from   {address}");
        if !yes && !confirm("Approve the token and subscribe?").await? {
            println!("Nothing was submitted");
            return Ok(());
        }

        match checkout.subscribe_with_wallet(plan_id).await? {
            WalletCheckout::Activated(subscription) => {
                println!("Subscription active");
                print_subscription(&subscription, None);
                Ok(())
            }
            WalletCheckout::Connected { address } => {
                bail!("wallet {address} connected but nothing was submitted")
            }
        }
    }

    async fn wait_for_activation(
        &self,
        checkout: &mut Checkout<RemoteStore, PortalWallet>,
    ) -> anyhow::Result<()> {
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let Some(snapshot) = checkout.refresh().await? else {
                bail!("no subscription to follow");
            };
            match snapshot.subscription.status {
                SubscriptionStatus::Active => {
                    println!("Subscription active");
                    print_subscription(&snapshot.subscription, snapshot.vault.as_ref());
                    return Ok(());
                }
                SubscriptionStatus::Cancelled => bail!("subscription was cancelled"),
                SubscriptionStatus::Pending => info!("Waiting for the deposit"),
            }
        }
    }

    pub async fn status(&self, subscription_id: Uuid) -> anyhow::Result<()> {
        let detail = self
            .client
            .subscription(subscription_id)
            .await
            .with_context(|| format!("failed to load subscription {subscription_id}"))?;
        print_response(&detail.subscription, detail.vault.as_ref());
        Ok(())
    }

    pub async fn list(&self, wallet_args: &WalletArgs) -> anyhow::Result<()> {
        let Some(address) = wallet_args.known_address()? else {
            bail!("list needs --address or PAYRAIL_PRIVATE_KEY");
        };
        let subscriptions = self
            .client
            .portal_subscriptions(&address.to_string())
            .await?;
        if subscriptions.is_empty() {
            println!("No subscriptions for {address}");
        }
        for entry in &subscriptions {
            println!(
                "{} · {} · {} {} every {} days",
                entry.merchant_name,
                entry.plan_name,
                entry.plan_price,
                entry.token_symbol,
                entry.interval.days()
            );
            print_response(&entry.subscription, entry.vault.as_ref());
        }
        Ok(())
    }

    pub async fn cancel(
        &self,
        subscription_id: Uuid,
        chain: ChainConfig,
        wallet_args: &WalletArgs,
    ) -> anyhow::Result<()> {
        let wallet = PortalWallet::from_args(wallet_args, &chain)?;
        if !wallet.is_configured(wallet_args) {
            bail!("cancel needs --address, --wallet-rpc or PAYRAIL_PRIVATE_KEY");
        }
        let subscription = self.checkout(&chain, wallet).cancel(subscription_id).await?;
        println!("Subscription cancelled");
        print_subscription(&subscription, None);
        Ok(())
    }
}

fn print_subscription(subscription: &Subscription, vault: Option<&DepositVault>) {
    print_response(
        &SubscriptionResponse::from(subscription),
        vault.map(DepositVaultResponse::from).as_ref(),
    );
}

fn print_response(subscription: &SubscriptionResponse, vault: Option<&DepositVaultResponse>) {
    println!("  id          {}", subscription.id);
    println!("  plan        {}", subscription.plan_id);
    println!("  subscriber  {}", subscription.subscriber_address);
    println!(
        "  status      {:?} ({:?})",
        subscription.status, subscription.activation_mode
    );
    if let Some(next) = subscription.next_billing_at.and_then(format_timestamp) {
        println!("  renews      {next}");
    }
    if let Some(cancelled) = subscription.cancelled_at.and_then(format_timestamp) {
        println!("  cancelled   {cancelled}");
    }
    if let Some(vault) = vault {
        println!("  vault       {} ({:?})", vault.vault_address, vault.status);
    }
}

async fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn format_timestamp(seconds: i64) -> Option<String> {
    let at = time::OffsetDateTime::from_unix_timestamp(seconds).ok()?;
    at.format(&time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(1_735_776_000).as_deref(),
            Some("2025-01-02T00:00:00Z")
        );
        assert_eq!(format_timestamp(i64::MAX), None);
    }

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
