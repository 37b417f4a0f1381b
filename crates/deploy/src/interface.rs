//! Read-only surface of the fraud detection contract used after deployment.

use alloy_core::sol;

/// Name of the contract artifact deployed by default.
pub const FRAUD_DETECTION_CONTRACT: &str = "FraudDetectionContractV2";

sol! {
    /// Post-deployment view functions of `FraudDetectionContractV2`.
    #[derive(Debug, PartialEq, Eq)]
    interface IFraudDetection {
        function getContractInfo()
            external
            view
            returns (address contractOwner, address oracleAddress, uint256 totalAssessments);

        function owner() external view returns (address);

        function oracle() external view returns (address);

        function getReputation(address wallet) external view returns (int256);

        function getFraudAssessment(address wallet)
            external
            view
            returns (
                bool hasMLPrediction,
                bool mlIsFraudulent,
                uint256 mlConfidence,
                uint256 mlTimestamp,
                int256 reputationScore,
                uint256 reportCount,
                uint256 overallRisk
            );
    }
}
