//! Solidity ABI of the monitored swap contract.
//!
//! Only the three events we watch are declared. Topic hashes and argument
//! layouts are generated from these declarations.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// A seller listed base asset for quote asset.
    #[derive(Debug, PartialEq, Eq)]
    event ListingCreated(
        uint256 listingId,
        address indexed seller,
        uint256 baseAmount,
        uint256 quoteAmount
    );

    /// A buyer took a listing.
    #[derive(Debug, PartialEq, Eq)]
    event SwapCompleted(
        uint256 listingId,
        address indexed buyer,
        uint256 quoteAmount,
        uint256 baseAmount
    );

    /// A seller accepted a buyer's offer on a listing.
    #[derive(Debug, PartialEq, Eq)]
    event OfferAccepted(
        uint256 listingId,
        address indexed seller,
        address indexed buyer,
        uint256 quoteAmount,
        uint256 baseAmount
    );
}
