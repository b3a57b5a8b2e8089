mod helpers;
mod mocks;
mod orders;
mod proofs;
mod qris;
