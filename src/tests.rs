#[cfg(test)]
mod token_tests {
    use crate::config::RuntimeConfig;
    use crate::core::{Address, Amount};
    use crate::runtime::{CallOutput, Deployment, FungibleCall, Runtime, RuntimeError};

    /// Deploy "SimpleToken" and mint to the first signer, like a fresh test fixture
    fn deploy_token_contract(mint_amount: Amount) -> (Runtime, Address, Vec<Address>) {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let signers = runtime.signers().to_vec();
        let token = runtime
            .deploy(
                signers[0],
                Deployment::Fungible {
                    name: "SimpleToken".to_string(),
                    symbol: "STT".to_string(),
                    decimals: "18".to_string(),
                },
            )
            .unwrap();
        runtime
            .execute(signers[0], token, FungibleCall::Mint { to: signers[0], amount: mint_amount }.into())
            .unwrap();
        (runtime, token, signers)
    }

    fn balance_of(runtime: &Runtime, token: Address, account: Address) -> Amount {
        runtime
            .query(token, &FungibleCall::BalanceOf { account }.into())
            .unwrap()
            .as_amount()
            .unwrap()
    }

    fn allowance(runtime: &Runtime, token: Address, owner: Address, spender: Address) -> Amount {
        runtime
            .query(token, &FungibleCall::Allowance { owner, spender }.into())
            .unwrap()
            .as_amount()
            .unwrap()
    }

    #[test]
    fn test_minting_self() {
        let (runtime, token, signers) = deploy_token_contract(10_000);
        assert_eq!(balance_of(&runtime, token, signers[0]), 10_000);
    }

    #[test]
    fn test_transfer_to_other() {
        let (mut runtime, token, signers) = deploy_token_contract(10_000);
        let (owner, other) = (signers[0], signers[1]);

        runtime
            .execute(owner, token, FungibleCall::Transfer { to: other, amount: 5_000 }.into())
            .unwrap();

        assert_eq!(balance_of(&runtime, token, owner), 5_000);
        assert_eq!(balance_of(&runtime, token, other), 5_000);
    }

    #[test]
    fn test_approve_other() {
        let (mut runtime, token, signers) = deploy_token_contract(10_000);
        let (owner, other) = (signers[0], signers[1]);

        runtime
            .execute(owner, token, FungibleCall::Approve { spender: other, amount: 3_000 }.into())
            .unwrap();

        assert_eq!(allowance(&runtime, token, owner, other), 3_000);
    }

    #[test]
    fn test_transfer_by_spender() {
        let (mut runtime, token, signers) = deploy_token_contract(10_000);
        let (owner, spender, receiver) = (signers[0], signers[1], signers[2]);

        runtime
            .execute(owner, token, FungibleCall::Approve { spender, amount: 3_000 }.into())
            .unwrap();
        let receipt = runtime
            .execute(
                spender,
                token,
                FungibleCall::TransferFrom { from: owner, to: receiver, amount: 2_000 }.into(),
            )
            .unwrap();

        assert_eq!(receipt.output, CallOutput::Bool(true));
        assert_eq!(balance_of(&runtime, token, receiver), 2_000);
        assert_eq!(allowance(&runtime, token, owner, spender), 1_000);
        assert_eq!(balance_of(&runtime, token, owner), 8_000);
    }

    #[test]
    fn test_spender_cannot_exceed_allowance() {
        let (mut runtime, token, signers) = deploy_token_contract(10_000);
        let (owner, spender, receiver) = (signers[0], signers[1], signers[2]);

        runtime
            .execute(owner, token, FungibleCall::Approve { spender, amount: 3_000 }.into())
            .unwrap();
        let result = runtime.execute(
            spender,
            token,
            FungibleCall::TransferFrom { from: owner, to: receiver, amount: 3_001 }.into(),
        );

        assert!(matches!(result, Err(RuntimeError::Reverted(_))));
        assert_eq!(balance_of(&runtime, token, receiver), 0);
        assert_eq!(balance_of(&runtime, token, owner), 10_000);
        assert_eq!(allowance(&runtime, token, owner, spender), 3_000);
    }

    #[test]
    fn test_deployments_are_independent() {
        let (mut runtime, first, signers) = deploy_token_contract(10_000);
        let second = runtime
            .deploy(
                signers[0],
                Deployment::Fungible {
                    name: "Other".to_string(),
                    symbol: "OTH".to_string(),
                    decimals: "6".to_string(),
                },
            )
            .unwrap();

        assert_eq!(balance_of(&runtime, first, signers[0]), 10_000);
        assert_eq!(balance_of(&runtime, second, signers[0]), 0);
        assert_eq!(
            runtime.query(second, &FungibleCall::Decimals.into()).unwrap(),
            CallOutput::Count(6)
        );
    }

    #[test]
    fn test_conservation_over_many_transfers() {
        let (mut runtime, token, signers) = deploy_token_contract(1_000);
        for (i, window) in signers.windows(2).take(5).enumerate() {
            let amount = 1_000 - (i as Amount) * 100;
            runtime
                .execute(window[0], token, FungibleCall::Transfer { to: window[1], amount }.into())
                .unwrap();
        }

        let total: Amount = signers.iter().map(|s| balance_of(&runtime, token, *s)).sum();
        assert_eq!(
            runtime.query(token, &FungibleCall::TotalSupply.into()).unwrap(),
            CallOutput::Amount(total)
        );
    }
}

#[cfg(test)]
mod nft_tests {
    use crate::config::RuntimeConfig;
    use crate::core::{Address, InterfaceId};
    use crate::runtime::{CallOutput, Deployment, NonFungibleCall, Runtime};

    fn deploy_nft_contract() -> (Runtime, Address, Vec<Address>) {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let signers = runtime.signers().to_vec();
        let nft = runtime
            .deploy(
                signers[0],
                Deployment::NonFungible {
                    name: "TEST".to_string(),
                    symbol: "TT".to_string(),
                    base_uri: "none".to_string(),
                },
            )
            .unwrap();
        (runtime, nft, signers)
    }

    fn supports(runtime: &Runtime, nft: Address, id: &str) -> bool {
        let interface_id: InterfaceId = id.parse().unwrap();
        runtime
            .query(nft, &NonFungibleCall::SupportsInterface { interface_id }.into())
            .unwrap()
            .as_bool()
            .unwrap()
    }

    #[test]
    fn test_supports_erc721_interface() {
        let (runtime, nft, _) = deploy_nft_contract();
        assert!(supports(&runtime, nft, "0x80ac58cd"));
    }

    #[test]
    fn test_rejects_unknown_interfaces() {
        let (runtime, nft, _) = deploy_nft_contract();
        assert!(!supports(&runtime, nft, "0xffffffff"));
        assert!(!supports(&runtime, nft, "0x12345678"));
    }

    #[test]
    fn test_mint_and_transfer_through_runtime() {
        let (mut runtime, nft, signers) = deploy_nft_contract();
        let (alice, bob) = (signers[0], signers[1]);

        runtime
            .execute(alice, nft, NonFungibleCall::Mint { to: alice, token_id: 1 }.into())
            .unwrap();
        runtime
            .execute(alice, nft, NonFungibleCall::Approve { to: bob, token_id: 1 }.into())
            .unwrap();
        runtime
            .execute(bob, nft, NonFungibleCall::TransferFrom { from: alice, to: bob, token_id: 1 }.into())
            .unwrap();

        assert_eq!(
            runtime.query(nft, &NonFungibleCall::OwnerOf { token_id: 1 }.into()).unwrap(),
            CallOutput::Address(bob)
        );
        assert_eq!(
            runtime.query(nft, &NonFungibleCall::TokenUri { token_id: 1 }.into()).unwrap(),
            CallOutput::Text("none1".to_string())
        );
        assert!(runtime
            .query(nft, &NonFungibleCall::OwnerOf { token_id: 2 }.into())
            .is_err());
    }
}
