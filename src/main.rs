mod config;
mod deploy_plan;
mod ethereum;

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use config::{Config, Overrides};
use deploy_plan::DeployPlan;
use ethereum::{
    address::AddressTranslator,
    artifact::FileArtifactResolver,
    contract::{CallOptions, ContractManager},
    error::ClientError,
    formatter, provider, CallRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries results only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = build_cli().get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                std::process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    let overrides = cli_overrides(&matches).or(Overrides::from_env());
    let result = match config.apply_overrides(overrides) {
        Ok(()) => execute(&config, &matches).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn build_cli() -> Command {
    let contract = || {
        Arg::new("contract")
            .required(true)
            .value_name("CONTRACT")
            .help("Compiled contract artifact, e.g. BufferBNBPool.json")
    };
    let address = || {
        Arg::new("address")
            .required(true)
            .value_name("ADDRESS")
            .help("Deployed contract address")
    };
    let function = || {
        Arg::new("function")
            .required(true)
            .value_name("FUNCTION")
            .help("Contract function name")
    };
    let args = || {
        Arg::new("args")
            .value_name("ARGS")
            .help("Arguments literal, e.g. '(100,\"0xabc...\")'")
    };
    let gas_limit = || {
        Arg::new("gas-limit")
            .long("gas-limit")
            .value_name("GAS")
            .value_parser(value_parser!(u64))
            .help("Gas allowance, overrides gas.default_gas_limit")
    };

    Command::new("godwoken-scripts")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deploy and interact with contracts on Godwoken through the Polyjuice web3 RPC")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .global(true)
                .help("Network to use, as named in the configuration"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .global(true)
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("private-key")
                .long("private-key")
                .value_name("KEY")
                .global(true)
                .help("Signing key, overrides DEPLOYER_PRIVATE_KEY"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("read")
                .about("Call a read-only contract function")
                .arg(contract())
                .arg(address())
                .arg(function())
                .arg(args()),
        )
        .subcommand(
            Command::new("write")
                .about("Send a transaction calling a contract function")
                .arg(contract())
                .arg(address())
                .arg(function())
                .arg(args())
                .arg(
                    Arg::new("value")
                        .long("value")
                        .value_name("WEI")
                        .help("Value to attach, decimal or 0x hex"),
                )
                .arg(gas_limit()),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy a compiled contract")
                .arg(contract())
                .arg(args().help("Constructor arguments literal"))
                .arg(gas_limit()),
        )
        .subcommand(
            Command::new("deploy-plan")
                .about("Deploy the contracts listed in a TOML manifest, in order")
                .arg(Arg::new("manifest").required(true).value_name("FILE")),
        )
        .subcommand(
            Command::new("events")
                .about("Fetch and decode past events of a contract")
                .arg(contract())
                .arg(address())
                .arg(
                    Arg::new("event")
                        .long("event")
                        .value_name("NAME")
                        .help("Only this event (default: all events)"),
                )
                .arg(
                    Arg::new("from-block")
                        .long("from-block")
                        .value_name("BLOCK")
                        .value_parser(value_parser!(u64))
                        .help("First block (default: earliest)"),
                )
                .arg(
                    Arg::new("to-block")
                        .long("to-block")
                        .value_name("BLOCK")
                        .value_parser(value_parser!(u64))
                        .help("Last block (default: latest)"),
                ),
        )
        .subcommand(
            Command::new("transfer")
                .about("Transfer native value from the signing account")
                .arg(Arg::new("to").required(true).value_name("ADDRESS"))
                .arg(Arg::new("value").required(true).value_name("WEI"))
                .arg(gas_limit()),
        )
        .subcommand(
            Command::new("balance")
                .about("Show the balance of an address (default: the signing account)")
                .arg(Arg::new("address").value_name("ADDRESS")),
        )
        .subcommand(
            Command::new("translate")
                .about("Translate an Ethereum address to a Godwoken short address")
                .arg(Arg::new("address").required(true).value_name("ETH_ADDRESS")),
        )
}

async fn execute(config: &Config, matches: &ArgMatches) -> Result<()> {
    let network = config.network(None)?;
    let translator = AddressTranslator::from_config(&network.godwoken)?;

    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("No command given, see --help"))?;

    if name == "translate" {
        let eth_address = required(sub, "address")?;
        let short_address = translator.eth_to_godwoken_short_address(eth_address)?;
        println!("0x{:x}", short_address);
        return Ok(());
    }

    let private_key = config
        .account
        .private_key
        .as_deref()
        .ok_or(ClientError::MissingPrivateKey)?;
    let client = provider::connect(network, private_key)?;
    info!(
        "Using network {} as 0x{:x}",
        config.default_network,
        ethereum::provider::ChainClient::signer_address(&client)
    );

    let manager = ContractManager::new(
        Arc::new(client),
        Arc::new(FileArtifactResolver::new(config.artifacts.search_dirs.clone())),
        translator,
        CallOptions {
            gas_limit: network.gas.default_gas_limit,
            check_balance_before_write: config.security.check_balance_before_write,
        },
    );

    match name {
        "read" => {
            let output = manager.read_contract(&call_request(sub)?).await?;
            print_json(&formatter::format_output(output))
        }
        "write" => {
            let receipt = manager.write_contract(&call_request(sub)?).await?;
            print_json(&receipt)
        }
        "deploy" => {
            let receipt = manager
                .deploy_contract(
                    required(sub, "contract")?,
                    optional(sub, "args"),
                    sub.get_one::<u64>("gas-limit").copied(),
                )
                .await?;
            print_json(&receipt)
        }
        "deploy-plan" => {
            let plan = DeployPlan::load(required(sub, "manifest")?).await?;
            let deployed = plan.run(&manager).await?;
            print_json(&deployed)
        }
        "events" => {
            let events = manager
                .fetch_events(
                    required(sub, "contract")?,
                    required(sub, "address")?,
                    optional(sub, "event"),
                    sub.get_one::<u64>("from-block").copied(),
                    sub.get_one::<u64>("to-block").copied(),
                )
                .await?;
            print_json(&events)
        }
        "transfer" => {
            let receipt = manager
                .transfer(
                    required(sub, "to")?,
                    required(sub, "value")?,
                    sub.get_one::<u64>("gas-limit").copied(),
                )
                .await?;
            print_json(&receipt)
        }
        "balance" => {
            let balance = manager.balance(optional(sub, "address")).await?;
            print_json(&serde_json::json!({ "balance": balance.to_string() }))
        }
        other => Err(anyhow!("Unknown command '{}'", other)),
    }
}

fn cli_overrides(matches: &ArgMatches) -> Overrides {
    let flag = |name: &str| matches.get_one::<String>(name).cloned();
    Overrides {
        network: flag("network"),
        rpc_url: flag("rpc-url"),
        private_key: flag("private-key"),
    }
}

fn call_request(sub: &ArgMatches) -> Result<CallRequest> {
    let function_name = required(sub, "function")?;
    ethereum::utils::validate_function_name(function_name)?;

    Ok(CallRequest {
        contract_name: required(sub, "contract")?.to_string(),
        contract_address: required(sub, "address")?.to_string(),
        function_name: function_name.to_string(),
        args: optional(sub, "args").map(str::to_string),
        value: sub.try_get_one::<String>("value").ok().flatten().cloned(),
        gas_limit: sub.try_get_one::<u64>("gas-limit").ok().flatten().copied(),
    })
}

fn required<'a>(sub: &'a ArgMatches, name: &str) -> Result<&'a str> {
    optional(sub, name).ok_or_else(|| anyhow!("Missing argument <{}>", name))
}

fn optional<'a>(sub: &'a ArgMatches, name: &str) -> Option<&'a str> {
    sub.get_one::<String>(name).map(|s| s.as_str())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_read_positional_arguments() {
        let matches = build_cli()
            .try_get_matches_from([
                "godwoken-scripts",
                "read",
                "BufferBNBPool.json",
                "0x075Dbc0e36eAbcAC7e9eBa9d3e261370F32434cA",
                "shareOf",
                "(\"0x08f8036A199f59163B0d02E8a53a05a215FfD716\")",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "read");

        let request = call_request(sub).unwrap();
        assert_eq!(request.contract_name, "BufferBNBPool.json");
        assert_eq!(request.function_name, "shareOf");
        assert_eq!(
            request.args.as_deref(),
            Some("(\"0x08f8036A199f59163B0d02E8a53a05a215FfD716\")")
        );
        assert_eq!(request.value, None);
        assert_eq!(request.gas_limit, None);
    }

    #[test]
    fn test_write_options() {
        let matches = build_cli()
            .try_get_matches_from([
                "godwoken-scripts",
                "write",
                "FakePriceProvider.json",
                "0x0bB0Cafd6cE6a54C82dF15F19F79f6BC7369116F",
                "setPrice",
                "(2003100)",
                "--value",
                "10",
                "--gas-limit",
                "500000",
                "--network",
                "devnet",
            ])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("network").map(String::as_str),
            Some("devnet")
        );

        let (_, sub) = matches.subcommand().unwrap();
        let request = call_request(sub).unwrap();
        assert_eq!(request.value.as_deref(), Some("10"));
        assert_eq!(request.gas_limit, Some(500000));
    }

    #[test]
    fn test_global_flags_become_overrides() {
        let matches = build_cli()
            .try_get_matches_from([
                "godwoken-scripts",
                "balance",
                "--network",
                "devnet",
                "--rpc-url",
                "http://127.0.0.1:8024",
                "--private-key",
                "0x01",
            ])
            .unwrap();
        assert_eq!(
            cli_overrides(&matches),
            Overrides {
                network: Some("devnet".to_string()),
                rpc_url: Some("http://127.0.0.1:8024".to_string()),
                private_key: Some("0x01".to_string()),
            }
        );

        let matches = build_cli()
            .try_get_matches_from(["godwoken-scripts", "balance"])
            .unwrap();
        assert_eq!(cli_overrides(&matches), Overrides::default());
    }

    #[test]
    fn test_invalid_function_name_is_rejected() {
        let matches = build_cli()
            .try_get_matches_from([
                "godwoken-scripts",
                "read",
                "Pool.json",
                "0x075Dbc0e36eAbcAC7e9eBa9d3e261370F32434cA",
                "share-of",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let err = call_request(sub).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::InvalidFunctionName { .. })
        ));
    }

    #[test]
    fn test_missing_positional_is_a_parse_error() {
        assert!(build_cli()
            .try_get_matches_from(["godwoken-scripts", "read", "Pool.json"])
            .is_err());
    }
}
