pub mod asn1;
