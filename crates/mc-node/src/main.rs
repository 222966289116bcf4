use anyhow::Context;
use clap::{Parser, ValueEnum};
use mc_blockchain::Blockchain;
use mc_node::{ConsensusKind, Network, Node, NodeConfig};
use mc_transaction::Transaction;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// minichain demo driver.
#[derive(Parser, Debug)]
#[command(
    name = "mc-node",
    version,
    about = "Run a small in-process minichain network",
    long_about = "Creates a handful of nodes sharing one genesis block, connects every \
                  pair of them, submits a few transactions, produces a block with the \
                  chosen consensus mechanism and broadcasts it to the peers."
)]
struct Cli {
    /// Number of nodes in the network.
    #[arg(short, long, default_value_t = 3, env = "MC_NODES")]
    nodes: usize,

    /// Proof-of-work difficulty (leading zero hex characters).
    #[arg(short, long, default_value_t = 2, env = "MC_DIFFICULTY")]
    difficulty: usize,

    /// Consensus mechanism.
    #[arg(short, long, default_value = "pow", env = "MC_CONSENSUS")]
    consensus: CliConsensus,

    /// Validator stake as ID=AMOUNT.  Repeatable; only used with `--consensus pos`.
    #[arg(long = "stake", value_parser = parse_stake, env = "MC_STAKES", value_delimiter = ',')]
    stakes: Vec<(String, f64)>,

    /// Suppress log output to stderr (run silently).
    #[arg(short, long, default_value_t = false, env = "MC_QUIET")]
    quiet: bool,
}

#[derive(ValueEnum, Debug, Clone)]
enum CliConsensus {
    /// Proof of work: blocks are mined by hash puzzle.
    Pow,
    /// Proof of stake: blocks are forged by a stake-weighted validator.
    Pos,
}

fn parse_stake(s: &str) -> Result<(String, f64), String> {
    let (id, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=AMOUNT, got `{s}`"))?;
    let amount: f64 = amount
        .parse()
        .map_err(|e| format!("invalid stake amount `{amount}`: {e}"))?;
    Ok((id.to_string(), amount))
}

/// `RUST_LOG` directives plus `info` for every minichain crate, or nothing
/// at all when `quiet` is set.
fn log_filter(quiet: bool) -> anyhow::Result<EnvFilter> {
    if quiet {
        return Ok(EnvFilter::new("off"));
    }
    let mut filter = EnvFilter::from_default_env();
    for directive in ["mc_node=info", "mc_consensus=info", "mc_blockchain=info"] {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.quiet)?)
        .init();

    let consensus = match cli.consensus {
        CliConsensus::Pow => ConsensusKind::ProofOfWork,
        CliConsensus::Pos if cli.stakes.is_empty() => ConsensusKind::ProofOfStake {
            stakes: ConsensusKind::default_stakes(),
        },
        CliConsensus::Pos => ConsensusKind::ProofOfStake {
            stakes: cli.stakes.clone(),
        },
    };

    info!(
        nodes = cli.nodes,
        difficulty = cli.difficulty,
        consensus = ?cli.consensus,
        "Starting minichain network"
    );

    // Every node starts from the same genesis so blocks link across nodes.
    let genesis_chain = Blockchain::new(cli.difficulty);

    let mut network = Network::new();
    let mut listeners = Vec::new();
    let ids: Vec<String> = (1..=cli.nodes.max(1)).map(|i| format!("node-{i}")).collect();

    for id in &ids {
        let config = NodeConfig {
            node_id: id.clone(),
            difficulty: cli.difficulty,
            consensus: consensus.clone(),
            quiet: cli.quiet,
        };
        let (node, mut events) = Node::with_blockchain(config, genesis_chain.clone())?;
        network.add_node(node);

        let node_id = id.clone();
        listeners.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                info!(node = %node_id, "NodeEvent: {event:?}");
            }
        }));
    }

    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            network.connect(a, b)?;
        }
    }

    let producer = &ids[0];

    match Transaction::new("Alice", "Bob", -5.0) {
        Ok(tx) => warn!(%tx, "Negative transaction was accepted"),
        Err(e) => info!("Rejected transaction as expected: {e}"),
    }

    let transactions = [
        Transaction::new("Alice", "Bob", 100.0)?,
        Transaction::new("Bob", "Carol", 40.0)?,
    ];
    for tx in &transactions {
        network
            .node_mut(producer)
            .context("producer node missing")?
            .submit_transaction(tx.clone());
        network.broadcast_transaction(producer, tx)?;
    }

    let block = network.produce_and_broadcast(producer)?;
    info!(hash = %block.hash(), "Block produced and broadcast");

    for id in &ids {
        let node = network.node_mut(id).context("node missing")?;
        let chain_valid = node.blockchain().is_valid();
        let tip_valid = node.validate_tip();
        info!(
            node = %id,
            height = node.blockchain().len() - 1,
            chain_valid,
            tip_valid,
            "Node state"
        );
    }

    if let Some(pos) = network
        .node(producer)
        .and_then(|node| node.consensus().proof_of_stake())
    {
        for (validator, stake) in pos.stakes().iter() {
            info!(
                %validator,
                stake,
                offenses = pos.slashing_record().offenses(validator),
                "Validator stake"
            );
        }
    }

    if !cli.quiet {
        if let Some(node) = network.node(producer) {
            print!("{}", node.blockchain());
        }
    }

    // Dropping the nodes closes their event channels so the listeners finish.
    drop(network);
    for listener in listeners {
        listener.await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_crate_that_logs() {
        let filter = log_filter(false).unwrap().to_string();
        for krate in ["mc_node", "mc_consensus", "mc_blockchain"] {
            assert!(filter.contains(&format!("{krate}=info")), "{krate} missing from {filter}");
        }
    }

    #[test]
    fn quiet_filter_is_off() {
        let filter = log_filter(true).unwrap().to_string();
        assert!(filter.contains("off"), "quiet filter was {filter}");
    }

    #[test]
    fn stake_flag_parses_id_and_amount() {
        assert_eq!(parse_stake("v1=12.5").unwrap(), ("v1".to_string(), 12.5));
        assert!(parse_stake("v1").is_err());
        assert!(parse_stake("v1=lots").is_err());
    }
}
